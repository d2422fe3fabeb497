//! One parser instance per open stream.
//!
//! A [`Session`] is fed byte chunks in order from a single delivery context
//! and reports to a [`StreamHandler`] synchronously. There is no locking:
//! callers that receive chunks on several threads must serialize access
//! before reaching the session.

use crate::config::SessionConfig;
use crate::dispatch::{decode_payload, resolve_boundary, Boundary};
use crate::parser::{AssemblerState, EventAssembler, LineAction, LineBuffer};
use crate::types::{SessionEvent, StreamError, TransportError};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Consumer callbacks. Invoked synchronously while a chunk is being fed, so
/// a slow handler holds up the stream.
pub trait StreamHandler<T> {
    /// A `data` block decoded as `T`.
    fn on_content(&mut self, content: T);
    /// A per-event failure. The session keeps going.
    fn on_error(&mut self, error: StreamError);
    /// The sentinel arrived (`None`) or the transport ended.
    fn on_complete(&mut self, error: Option<TransportError>);
    fn on_comment(&mut self, _comment: &str) {}
    /// Nobody is listening any more. Drivers stop reading when this is true.
    fn is_closed(&self) -> bool {
        false
    }
}

impl<T, H: StreamHandler<T> + ?Sized> StreamHandler<T> for &mut H {
    fn on_content(&mut self, content: T) {
        (**self).on_content(content)
    }
    fn on_error(&mut self, error: StreamError) {
        (**self).on_error(error)
    }
    fn on_complete(&mut self, error: Option<TransportError>) {
        (**self).on_complete(error)
    }
    fn on_comment(&mut self, comment: &str) {
        (**self).on_comment(comment)
    }
    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

/// Forward every callback as a [`SessionEvent`]. Once the receiver is
/// dropped, sends are discarded and `is_closed` reports it.
impl<T> StreamHandler<T> for mpsc::UnboundedSender<SessionEvent<T>> {
    fn on_content(&mut self, content: T) {
        let _ = self.send(SessionEvent::Content(content));
    }
    fn on_error(&mut self, error: StreamError) {
        let _ = self.send(SessionEvent::Error(error));
    }
    fn on_complete(&mut self, error: Option<TransportError>) {
        let _ = self.send(SessionEvent::Complete(error));
    }
    fn on_comment(&mut self, comment: &str) {
        let _ = self.send(SessionEvent::Comment(comment.to_string()));
    }
    fn is_closed(&self) -> bool {
        mpsc::UnboundedSender::is_closed(self)
    }
}

/// Parser state for a single stream, decoding payloads as `T`.
pub struct Session<T, H> {
    config: SessionConfig,
    lines: LineBuffer,
    assembler: EventAssembler,
    handler: H,
    completed: bool,
    _payload: PhantomData<fn() -> T>,
}

impl<T, H> Session<T, H>
where
    T: DeserializeOwned,
    H: StreamHandler<T>,
{
    pub fn new(handler: H) -> Self {
        Self::with_config(SessionConfig::default(), handler)
    }

    pub fn with_config(config: SessionConfig, handler: H) -> Self {
        Self {
            assembler: EventAssembler::new(config.strip_carriage_return),
            lines: LineBuffer::new(),
            config,
            handler,
            completed: false,
            _payload: PhantomData,
        }
    }

    /// Feed the next chunk from the transport.
    ///
    /// Chunk boundaries need not line up with lines or events. A chunk that
    /// is not valid UTF-8 is reported via `on_error` and skipped.
    pub fn feed(&mut self, chunk: &[u8]) {
        for line in self.lines.append(chunk) {
            match line {
                Ok(line) => self.process_line(&line),
                Err(e) => self.handler.on_error(e),
            }
        }
    }

    /// Process one complete line, without its terminating `\n`.
    pub fn process_line(&mut self, line: &str) {
        match self.assembler.process_line(line) {
            LineAction::Continue => {}
            LineAction::Comment(text) => {
                trace!("SSE comment: {}", text);
                if self.config.surface_comments {
                    self.handler.on_comment(text);
                }
            }
            LineAction::Dispatch => self.dispatch(),
        }
    }

    fn dispatch(&mut self) {
        let pending = self.assembler.pending_mut();
        let event_type = pending.event_type.clone();
        match resolve_boundary(pending, &self.config.sentinel) {
            Boundary::Done => {
                debug!("SSE stream finished by sentinel");
                self.completed = true;
                self.handler.on_complete(None);
            }
            Boundary::Empty => {}
            Boundary::Payload(payload) => match decode_payload::<T>(&payload) {
                Ok(content) => self.handler.on_content(content),
                Err(e) => {
                    warn!(
                        "Failed to decode SSE payload (event={:?}): {} data={}",
                        event_type, e, payload
                    );
                    self.handler.on_error(e);
                }
            },
        }
    }

    /// Report the transport's terminal notification.
    ///
    /// Always forwarded, even if the sentinel already completed the stream.
    pub fn complete(&mut self, error: Option<TransportError>) {
        match &error {
            Some(e) => debug!("SSE transport ended with error: {}", e),
            None => debug!("SSE transport ended"),
        }
        self.completed = true;
        self.handler.on_complete(error);
    }

    /// Whether `on_complete` has been invoked.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn state(&self) -> AssemblerState {
        self.assembler.state()
    }

    pub fn last_event_id(&self) -> Option<&str> {
        self.assembler.pending().last_event_id.as_deref()
    }

    pub fn event_type(&self) -> Option<&str> {
        self.assembler.pending().event_type.as_deref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether the handler has lost its consumer.
    pub fn is_handler_closed(&self) -> bool {
        self.handler.is_closed()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }
}
