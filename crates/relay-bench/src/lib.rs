//! Shared fixtures for the Relay benchmarks.

use tenvis_relay_core::{ChatRelay, Subscription};

/// Create a relay with `count` attached subscribers.
///
/// The subscriptions must be kept alive for the subscribers to count.
#[must_use]
pub fn relay_with_subscribers(count: usize) -> (ChatRelay, Vec<Subscription>) {
    let relay = ChatRelay::new();
    let subscriptions = (0..count).map(|_| relay.subscribe()).collect();
    (relay, subscriptions)
}

/// Generate `count` distinct usernames.
#[must_use]
pub fn usernames(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("user-{i}")).collect()
}
