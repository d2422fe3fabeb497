pub mod config;
pub mod dispatch;
pub mod parser;
pub mod session;
pub mod transport;
pub mod types;

pub use config::SessionConfig;
pub use parser::{AssemblerState, EventAssembler, LineAction, LineBuffer, PendingEvent};
pub use session::{Session, StreamHandler};
pub use transport::{drive, response_events, spawn_events, EventStream};
pub use types::*;
