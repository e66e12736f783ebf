//! Chat event types for Relay.
//!
//! Events are immutable once constructed and are shared between
//! subscribers behind an `Arc`.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// The kind of chat activity an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A chat message.
    Message,
    /// A user entered the chat.
    Join,
    /// A user left the chat.
    Leave,
}

impl EventKind {
    /// Get the canonical upper-case name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "MESSAGE",
            Self::Join => "JOIN",
            Self::Leave => "LEAVE",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Milliseconds since the UNIX epoch.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// One unit of chat activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    username: String,
    body: String,
    timestamp: u64,
    kind: EventKind,
}

impl ChatEvent {
    fn new(username: String, body: String, kind: EventKind) -> Self {
        Self {
            username,
            body,
            timestamp: now_millis(),
            kind,
        }
    }

    /// Create a chat message event.
    #[must_use]
    pub fn message(username: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(username.into(), body.into(), EventKind::Message)
    }

    /// Create a join event with a generated presence notice.
    #[must_use]
    pub fn joined(username: impl Into<String>) -> Self {
        let username = username.into();
        let body = format!("{username} joined the chat");
        Self::new(username, body, EventKind::Join)
    }

    /// Create a leave event with a generated presence notice.
    #[must_use]
    pub fn left(username: impl Into<String>) -> Self {
        let username = username.into();
        let body = format!("{username} left the chat");
        Self::new(username, body, EventKind::Leave)
    }

    /// The user the event is about.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Message text, or the presence notice for join/leave events.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Creation time in milliseconds since the UNIX epoch.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Whether this is a message, join or leave.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}
