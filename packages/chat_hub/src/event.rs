use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened in the room
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Join,
    Leave,
    Message,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Join => "join",
            EventKind::Leave => "leave",
            EventKind::Message => "message",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat occurrence.
///
/// Events are never mutated after construction: the hub clones the same
/// value into the archive and into every subscriber's feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    kind: EventKind,
    user: String,
    /// Seconds since the Unix epoch
    timestamp: i64,
    #[serde(default)]
    text: String,
}

impl Event {
    fn new(kind: EventKind, user: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            user: user.into(),
            timestamp: Utc::now().timestamp(),
            text: text.into(),
        }
    }

    /// A user entered the room
    pub fn join(user: impl Into<String>) -> Self {
        Self::new(EventKind::Join, user, String::new())
    }

    /// A user said something
    pub fn message(user: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(EventKind::Message, user, text)
    }

    /// A user left the room
    pub fn leave(user: impl Into<String>) -> Self {
        Self::new(EventKind::Leave, user, String::new())
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EventKind::Message => write!(f, "[{}] {}: {}", self.timestamp, self.user, self.text),
            kind => write!(f, "[{}] {} {}", self.timestamp, self.user, kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_and_leave_carry_no_text() {
        let join = Event::join("alice");
        assert_eq!(join.kind(), EventKind::Join);
        assert_eq!(join.user(), "alice");
        assert!(join.text().is_empty());

        let leave = Event::leave("alice");
        assert_eq!(leave.kind(), EventKind::Leave);
        assert!(leave.text().is_empty());
    }

    #[test]
    fn message_keeps_text() {
        let event = Event::message("bob", "hi there");
        assert_eq!(event.kind(), EventKind::Message);
        assert_eq!(event.user(), "bob");
        assert_eq!(event.text(), "hi there");
    }

    #[test]
    fn timestamp_is_current_unix_seconds() {
        let before = Utc::now().timestamp();
        let event = Event::join("carol");
        let after = Utc::now().timestamp();
        assert!(event.timestamp() >= before && event.timestamp() <= after);
    }

    #[test]
    fn serializes_as_flat_field_set() {
        let event = Event::message("dave", "hello");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "message");
        assert_eq!(value["user"], "dave");
        assert_eq!(value["text"], "hello");
        assert_eq!(value["timestamp"], event.timestamp());

        let back: Event = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn missing_text_defaults_to_empty() {
        let event: Event =
            serde_json::from_str(r#"{"kind":"leave","user":"erin","timestamp":42}"#).unwrap();
        assert_eq!(event.kind(), EventKind::Leave);
        assert_eq!(event.timestamp(), 42);
        assert_eq!(event.text(), "");
    }

    #[test]
    fn display() {
        let event: Event =
            serde_json::from_str(r#"{"kind":"message","user":"f","timestamp":7,"text":"yo"}"#)
                .unwrap();
        assert_eq!(event.to_string(), "[7] f: yo");
        let event: Event =
            serde_json::from_str(r#"{"kind":"join","user":"f","timestamp":7}"#).unwrap();
        assert_eq!(event.to_string(), "[7] f join");
    }
}
