//! Incremental SSE wire parsing: bytes to lines, lines to pending events.

pub mod assembler;
pub mod line_buffer;

pub use assembler::{AssemblerState, EventAssembler, LineAction, PendingEvent};
pub use line_buffer::LineBuffer;
