use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Structured error schema
// ---------------------------------------------------------------------------

/// Fixed error payload used when a `data` block does not match the
/// consumer's result type.
///
/// Matches the common `{"error": {"message": ..., "type": ...}}` shape
/// returned by chat-completion style APIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    /// Some APIs send a string code, others a number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<serde_json::Value>,
}

impl ApiError {
    pub fn message(&self) -> &str {
        &self.error.message
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error.kind {
            Some(kind) => write!(f, "{} ({})", self.error.message, kind),
            None => f.write_str(&self.error.message),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Per-event errors. None of these end the session.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Unknown encoding: chunk is not valid UTF-8 ({0})")]
    UnknownEncoding(#[from] std::str::Utf8Error),
    #[error("Empty content")]
    EmptyContent,
    #[error("Decode error: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("API error: {0}")]
    Api(ApiError),
}

impl StreamError {
    /// Whether the server sent a well-formed error payload, as opposed to
    /// malformed input.
    pub fn is_api_error(&self) -> bool {
        matches!(self, Self::Api(_))
    }

    pub fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }
}

/// Failures reported through `on_complete`, never through `on_error`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// SessionEvent — channel form of the consumer callbacks
// ---------------------------------------------------------------------------

/// One consumer-facing notification. Sent in the same order the callbacks
/// would have been invoked.
#[derive(Debug)]
pub enum SessionEvent<T> {
    /// A `data` block decoded as the consumer's type
    Content(T),
    /// A per-event failure; the stream continues
    Error(StreamError),
    /// Stream finished: sentinel (`None`) or transport end/failure
    Complete(Option<TransportError>),
    /// Comment line text, leading whitespace trimmed
    Comment(String),
}

impl<T> SessionEvent<T> {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_minimal_shape() {
        let e: ApiError = serde_json::from_str(r#"{"error":{"message":"bad key"}}"#).unwrap();
        assert_eq!(e.message(), "bad key");
        assert!(e.error.kind.is_none());
        assert_eq!(e.to_string(), "bad key");
    }

    #[test]
    fn test_api_error_full_shape() {
        let e: ApiError = serde_json::from_str(
            r#"{"error":{"message":"slow down","type":"rate_limit","param":null,"code":429}}"#,
        )
        .unwrap();
        assert_eq!(e.error.kind.as_deref(), Some("rate_limit"));
        assert_eq!(e.error.code, Some(serde_json::json!(429)));
        assert_eq!(e.to_string(), "slow down (rate_limit)");
    }

    #[test]
    fn test_api_error_rejects_other_shapes() {
        assert!(serde_json::from_str::<ApiError>(r#"{"message":"x"}"#).is_err());
        assert!(serde_json::from_str::<ApiError>(r#"{"error":"x"}"#).is_err());
    }

    #[test]
    fn test_stream_error_predicates() {
        let api = StreamError::Api(ApiError {
            error: ApiErrorDetail {
                message: "nope".into(),
                kind: None,
                param: None,
                code: None,
            },
        });
        assert!(api.is_api_error());
        assert_eq!(api.as_api_error().unwrap().message(), "nope");
        assert!(!StreamError::EmptyContent.is_api_error());
    }
}
