//! JSON wire types shared by the HTTP, SSE and WebSocket adapters.

use serde::{Deserialize, Serialize};
use tenvis_relay_core::{ChatEvent, EventKind};

/// Route names, shared by HTTP metrics and WebSocket frames.
pub mod routes {
    pub const SEND: &str = "chat.send";
    pub const JOIN: &str = "chat.join";
    pub const LEAVE: &str = "chat.leave";
    pub const USERS: &str = "chat.users";
    pub const STREAM: &str = "chat.stream";
}

/// Event kind as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WireKind {
    Message,
    Join,
    Leave,
}

impl From<EventKind> for WireKind {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Message => Self::Message,
            EventKind::Join => Self::Join,
            EventKind::Leave => Self::Leave,
        }
    }
}

/// A chat event as sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEvent {
    pub username: String,
    pub message: String,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: u64,
    #[serde(rename = "type")]
    pub kind: WireKind,
}

impl From<&ChatEvent> for WireEvent {
    fn from(event: &ChatEvent) -> Self {
        Self {
            username: event.username().to_string(),
            message: event.body().to_string(),
            timestamp: event.timestamp(),
            kind: event.kind().into(),
        }
    }
}

/// Body of a send request. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct SendRequest {
    pub username: String,
    #[serde(default)]
    pub message: String,
}

/// Body of a join or leave request.
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceRequest {
    pub username: String,
}

/// A frame received over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    pub route: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// A frame sent over the WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A chat event from the stream.
    Event(WireEvent),
    /// A request was processed.
    Ack { route: String },
    /// Reply to `chat.users`.
    Users { users: Vec<String> },
    /// A request was rejected.
    Error { message: String },
}

impl ServerFrame {
    #[must_use]
    pub fn ack(route: &str) -> Self {
        Self::Ack {
            route: route.to_string(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
