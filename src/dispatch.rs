//! Event boundary handling: sentinel detection and typed payload decoding.

use crate::parser::PendingEvent;
use crate::types::{ApiError, StreamError};
use serde::de::DeserializeOwned;

/// Outcome of reaching a blank line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Boundary {
    /// Sentinel payload: the stream is finished.
    Done,
    /// No data was sent for this boundary.
    Empty,
    /// Data to decode, with the trailing newline removed.
    Payload(String),
}

/// Resolve the pending event at a boundary and reset it for the next one.
///
/// The sentinel clears everything including `last_event_id`; the other two
/// outcomes leave `last_event_id` in place.
pub fn resolve_boundary(pending: &mut PendingEvent, sentinel: &str) -> Boundary {
    if pending.payload().trim() == sentinel {
        pending.clear_all();
        return Boundary::Done;
    }

    if pending.data.is_empty() {
        pending.event_type = None;
        return Boundary::Empty;
    }

    let payload = pending.payload().to_string();
    pending.clear_event();
    Boundary::Payload(payload)
}

/// Decode a payload as `T`, falling back to the structured error schema.
///
/// When neither schema matches, the error from the primary decode is kept.
pub fn decode_payload<T: DeserializeOwned>(payload: &str) -> Result<T, StreamError> {
    let bytes = payload.as_bytes();
    match serde_json::from_slice::<T>(bytes) {
        Ok(value) => Ok(value),
        Err(primary) => match serde_json::from_slice::<ApiError>(bytes) {
            Ok(api) => Err(StreamError::Api(api)),
            Err(_) => Err(StreamError::Decode(primary)),
        },
    }
}
