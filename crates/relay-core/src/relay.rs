//! Chat orchestration for Relay.
//!
//! The relay composes the presence registry and the broadcast bus into the
//! operations transport adapters call: send, join, leave, list and
//! subscribe. None of them block or fail once the relay is built.

use crate::bus::{BroadcastBus, Subscription, DEFAULT_CHANNEL_CAPACITY};
use crate::event::ChatEvent;
use crate::presence::PresenceRegistry;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

/// Largest accepted bus capacity.
pub const MAX_CHANNEL_CAPACITY: usize = 1 << 20;

/// Relay errors.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Bus capacity out of range.
    #[error("Invalid channel capacity {0}: must be between 1 and {MAX_CHANNEL_CAPACITY}")]
    InvalidCapacity(usize),
}

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Unread events buffered per subscriber before the oldest are dropped.
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl RelayConfig {
    /// Check the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel capacity is zero or too large.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.channel_capacity == 0 || self.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(RelayError::InvalidCapacity(self.channel_capacity));
        }
        Ok(())
    }
}

/// The chat relay.
#[derive(Debug)]
pub struct ChatRelay {
    presence: PresenceRegistry,
    bus: BroadcastBus,
}

impl ChatRelay {
    /// Create a relay with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            presence: PresenceRegistry::new(),
            bus: BroadcastBus::new(),
        }
    }

    /// Create a relay with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_config(config: RelayConfig) -> Result<Self, RelayError> {
        config.validate()?;
        info!("Creating relay with config: {:?}", config);
        Ok(Self {
            presence: PresenceRegistry::new(),
            bus: BroadcastBus::with_capacity(config.channel_capacity),
        })
    }

    /// Relay a chat message. The sender does not need to have joined.
    ///
    /// Returns the number of subscribers the message was handed to.
    pub fn send_message(&self, username: &str, body: &str) -> usize {
        self.bus.publish(ChatEvent::message(username, body))
    }

    /// Mark a user as connected.
    ///
    /// Publishes a join event and returns `true` only if the user was not
    /// already present.
    pub fn user_joined(&self, username: &str) -> bool {
        if !self.presence.join(username) {
            debug!(username = %username, "Duplicate join ignored");
            return false;
        }
        self.bus.publish(ChatEvent::joined(username));
        true
    }

    /// Mark a user as disconnected.
    ///
    /// Publishes a leave event and returns `true` only if the user was
    /// present.
    pub fn user_left(&self, username: &str) -> bool {
        if !self.presence.leave(username) {
            debug!(username = %username, "Leave for absent user ignored");
            return false;
        }
        self.bus.publish(ChatEvent::left(username));
        true
    }

    /// Get a copy of the connected usernames.
    #[must_use]
    pub fn connected_users(&self) -> HashSet<String> {
        self.presence.snapshot()
    }

    /// Attach a new subscriber to the event stream.
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    /// Get relay statistics.
    #[must_use]
    pub fn stats(&self) -> RelayStats {
        RelayStats {
            subscriber_count: self.bus.subscriber_count(),
            connected_users: self.presence.count(),
        }
    }
}

impl Default for ChatRelay {
    fn default() -> Self {
        Self::new()
    }
}

/// Relay statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    /// Number of attached subscribers.
    pub subscriber_count: usize,
    /// Number of connected users.
    pub connected_users: usize,
}
