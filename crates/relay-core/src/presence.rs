//! Presence tracking for Relay.
//!
//! The registry is the source of truth for which usernames are currently
//! in the chat. `join` and `leave` report whether membership actually
//! changed, and callers emit presence events only on a change.

use dashmap::DashSet;
use std::collections::HashSet;
use tracing::debug;

/// Concurrent set of connected usernames.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    members: DashSet<String>,
}

impl PresenceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user to the registry.
    ///
    /// Returns `true` only if the user was not already present. When several
    /// callers race on the same username exactly one of them observes `true`.
    pub fn join(&self, username: &str) -> bool {
        let added = self.members.insert(username.to_string());
        if added {
            debug!(username = %username, "Presence: user joined");
        }
        added
    }

    /// Remove a user from the registry.
    ///
    /// Returns `true` only if the user was present and this call removed it.
    pub fn leave(&self, username: &str) -> bool {
        let removed = self.members.remove(username).is_some();
        if removed {
            debug!(username = %username, "Presence: user left");
        }
        removed
    }

    /// Check if a user is present.
    #[must_use]
    pub fn contains(&self, username: &str) -> bool {
        self.members.contains(username)
    }

    /// Get the number of present users.
    #[must_use]
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Check if nobody is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Copy the current membership.
    ///
    /// The returned set is independent of the registry.
    #[must_use]
    pub fn snapshot(&self) -> HashSet<String> {
        self.members.iter().map(|name| name.key().clone()).collect()
    }
}
