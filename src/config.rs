//! Per-session parser settings.

/// Default completion literal sent by chat-completion style streams.
pub const DEFAULT_SENTINEL: &str = "[DONE]";

/// Configuration for a [`Session`](crate::Session).
///
/// Defaults: `[DONE]` sentinel, comments surfaced, CRLF tolerated.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Payload literal that marks normal end of stream.
    pub sentinel: String,
    /// Forward comment lines to `on_comment`.
    pub surface_comments: bool,
    /// Remove one trailing `\r` from each line before classifying it.
    pub strip_carriage_return: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            surface_comments: true,
            strip_carriage_return: true,
        }
    }
}

impl SessionConfig {
    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn with_surface_comments(mut self, surface: bool) -> Self {
        self.surface_comments = surface;
        self
    }

    pub fn with_strip_carriage_return(mut self, strip: bool) -> Self {
        self.strip_carriage_return = strip;
        self
    }
}
