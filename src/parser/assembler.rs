//! Line classification and field accumulation.

use tracing::trace;

/// Fields collected since the last event boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingEvent {
    /// Every `data` value followed by `\n`.
    pub data: String,
    /// Last `event:` value.
    pub event_type: Option<String>,
    /// Last `id:` value. Survives ordinary dispatch.
    pub last_event_id: Option<String>,
}

impl PendingEvent {
    /// Accumulated data with exactly one trailing newline removed.
    pub fn payload(&self) -> &str {
        self.data.strip_suffix('\n').unwrap_or(&self.data)
    }

    /// Reset after a dispatch attempt. `last_event_id` is kept.
    pub fn clear_event(&mut self) {
        self.data.clear();
        self.event_type = None;
    }

    /// Reset everything, including `last_event_id`.
    pub fn clear_all(&mut self) {
        self.clear_event();
        self.last_event_id = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssemblerState {
    #[default]
    Idle,
    Accumulating,
}

/// What the caller should do after a line has been processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAction<'a> {
    /// Field stored (or ignored); nothing to report.
    Continue,
    /// Blank line: the pending event should be dispatched.
    Dispatch,
    /// Comment text with leading whitespace removed.
    Comment(&'a str),
}

/// Classifies lines and folds field values into a [`PendingEvent`].
#[derive(Debug, Default)]
pub struct EventAssembler {
    pending: PendingEvent,
    state: AssemblerState,
    strip_carriage_return: bool,
}

impl EventAssembler {
    pub fn new(strip_carriage_return: bool) -> Self {
        Self {
            strip_carriage_return,
            ..Default::default()
        }
    }

    pub fn process_line<'a>(&mut self, line: &'a str) -> LineAction<'a> {
        let line = if self.strip_carriage_return {
            line.strip_suffix('\r').unwrap_or(line)
        } else {
            line
        };

        if line.is_empty() {
            self.state = AssemblerState::Idle;
            return LineAction::Dispatch;
        }

        if let Some(comment) = line.strip_prefix(':') {
            return LineAction::Comment(comment.trim_start());
        }

        let (name, value) = match line.split_once(':') {
            Some((name, value)) => (name.trim(), value.strip_prefix(' ').unwrap_or(value)),
            None => (line.trim(), ""),
        };
        self.state = AssemblerState::Accumulating;

        match name {
            "data" => {
                self.pending.data.push_str(value);
                self.pending.data.push('\n');
            }
            "event" => self.pending.event_type = Some(value.to_string()),
            "id" => self.pending.last_event_id = Some(value.to_string()),
            "retry" => match value.trim().parse::<u64>() {
                // Reconnection is the transport's business; the interval is not kept.
                Ok(ms) => trace!("Ignoring retry interval of {}ms", ms),
                Err(_) => trace!("Ignoring malformed retry value {:?}", value),
            },
            other => trace!("Ignoring unknown field {:?}", other),
        }

        LineAction::Continue
    }

    pub fn pending(&self) -> &PendingEvent {
        &self.pending
    }

    pub fn pending_mut(&mut self) -> &mut PendingEvent {
        &mut self.pending
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> EventAssembler {
        EventAssembler::new(true)
    }

    #[test]
    fn test_blank_line_requests_dispatch() {
        let mut a = assembler();
        assert_eq!(a.process_line(""), LineAction::Dispatch);
        assert_eq!(a.state(), AssemblerState::Idle);
    }

    #[test]
    fn test_comment_does_not_touch_pending() {
        let mut a = assembler();
        assert_eq!(a.process_line(":   keep-alive"), LineAction::Comment("keep-alive"));
        assert_eq!(a.process_line(":"), LineAction::Comment(""));
        assert_eq!(*a.pending(), PendingEvent::default());
        assert_eq!(a.state(), AssemblerState::Idle);
    }

    #[test]
    fn test_data_lines_are_newline_joined() {
        let mut a = assembler();
        a.process_line("data: a");
        a.process_line("data:b");
        assert_eq!(a.pending().data, "a\nb\n");
        assert_eq!(a.pending().payload(), "a\nb");
        assert_eq!(a.state(), AssemblerState::Accumulating);
    }

    #[test]
    fn test_only_one_leading_space_stripped() {
        let mut a = assembler();
        a.process_line("data:   x");
        assert_eq!(a.pending().payload(), "  x");
    }

    #[test]
    fn test_value_keeps_later_colons() {
        let mut a = assembler();
        a.process_line(r#"data: {"a":"b:c"}"#);
        assert_eq!(a.pending().payload(), r#"{"a":"b:c"}"#);
    }

    #[test]
    fn test_field_without_colon_has_empty_value() {
        let mut a = assembler();
        a.process_line("data");
        assert_eq!(a.pending().data, "\n");
        a.process_line("event");
        assert_eq!(a.pending().event_type.as_deref(), Some(""));
    }

    #[test]
    fn test_event_and_id_replace() {
        let mut a = assembler();
        a.process_line("event: first");
        a.process_line("event: second");
        a.process_line("id: 1");
        a.process_line("id: 2");
        assert_eq!(a.pending().event_type.as_deref(), Some("second"));
        assert_eq!(a.pending().last_event_id.as_deref(), Some("2"));
    }

    #[test]
    fn test_field_name_is_trimmed() {
        let mut a = assembler();
        a.process_line(" event : ping");
        assert_eq!(a.pending().event_type.as_deref(), Some("ping"));
    }

    #[test]
    fn test_retry_and_unknown_fields_are_ignored() {
        let mut a = assembler();
        assert_eq!(a.process_line("retry: 3000"), LineAction::Continue);
        assert_eq!(a.process_line("retry: soon"), LineAction::Continue);
        assert_eq!(a.process_line("foo: bar"), LineAction::Continue);
        assert_eq!(a.pending().data, "");
        assert!(a.pending().event_type.is_none());
    }

    #[test]
    fn test_carriage_return_handling() {
        let mut a = assembler();
        a.process_line("data: x\r");
        assert_eq!(a.process_line("\r"), LineAction::Dispatch);
        assert_eq!(a.pending().payload(), "x");

        let mut raw = EventAssembler::new(false);
        raw.process_line("data: x\r");
        assert_eq!(raw.process_line("\r"), LineAction::Continue);
        assert_eq!(raw.pending().payload(), "x\r");
    }

    #[test]
    fn test_clear_event_keeps_id() {
        let mut p = PendingEvent {
            data: "x\n".into(),
            event_type: Some("e".into()),
            last_event_id: Some("7".into()),
        };
        p.clear_event();
        assert_eq!(p.data, "");
        assert!(p.event_type.is_none());
        assert_eq!(p.last_event_id.as_deref(), Some("7"));
        p.clear_all();
        assert!(p.last_event_id.is_none());
    }
}
