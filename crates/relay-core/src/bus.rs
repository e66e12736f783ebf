//! Broadcast bus for Relay.
//!
//! A single multicast channel of chat events. Subscribers may attach at
//! any time and only see events published after they attached. Publishing
//! never blocks: a subscriber that falls more than `capacity` events behind
//! loses its oldest unread events instead of holding up the publisher.

use crate::event::ChatEvent;
use futures_util::stream::{self, Stream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, trace, warn};

/// Default broadcast channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A subscriber identifier, unique per bus.
pub type SubscriberId = u64;

/// Multicast channel of chat events.
///
/// All events go through one `broadcast` channel, so every subscriber
/// observes the same total order. Two publishes that do not overlap in time
/// are seen by every subscriber in the order they were made.
#[derive(Debug)]
pub struct BroadcastBus {
    sender: broadcast::Sender<Arc<ChatEvent>>,
    capacity: usize,
    next_id: AtomicU64,
}

impl BroadcastBus {
    /// Create a bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus buffering up to `capacity` unread events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Use [`crate::RelayConfig::validate`] to
    /// check untrusted values first.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            capacity,
            next_id: AtomicU64::new(1),
        }
    }

    /// Publish an event to every attached subscriber.
    ///
    /// Returns the number of subscribers the event was handed to. Publishing
    /// with no subscribers is a no-op that returns 0. A subscriber counted
    /// here can still lose the event if it falls `capacity` events behind
    /// before reading it.
    pub fn publish(&self, event: ChatEvent) -> usize {
        let kind = event.kind();
        let recipients = self.sender.send(Arc::new(event)).unwrap_or_default();
        trace!(kind = %kind, recipients, "Published event");
        recipients
    }

    /// Attach a new subscriber starting from now.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let receiver = self.sender.subscribe();
        debug!(subscriber = id, subscribers = self.subscriber_count(), "Subscriber attached");
        Subscription {
            id,
            receiver: Some(receiver),
            missed: 0,
        }
    }

    /// Get the number of attached subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the bus capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A live, forward-only view of the bus.
///
/// Dropping the subscription detaches it. Once detached it yields nothing;
/// call [`BroadcastBus::subscribe`] again to resume.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: Option<broadcast::Receiver<Arc<ChatEvent>>>,
    missed: u64,
}

impl Subscription {
    /// Identifier assigned when the subscriber attached.
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the subscription is detached or the bus is gone.
    pub async fn recv(&mut self) -> Option<Arc<ChatEvent>> {
        loop {
            let result = self.receiver.as_mut()?.recv().await;
            match result {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(RecvError::Closed) => {
                    self.unsubscribe();
                    return None;
                }
            }
        }
    }

    /// Take the next event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<Arc<ChatEvent>> {
        loop {
            let result = self.receiver.as_mut()?.try_recv();
            match result {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Closed) => {
                    self.unsubscribe();
                    return None;
                }
            }
        }
    }

    /// Detach from the bus. Calling this more than once has no effect.
    pub fn unsubscribe(&mut self) {
        if self.receiver.take().is_some() {
            debug!(subscriber = self.id, missed = self.missed, "Subscriber detached");
        }
    }

    /// Check if the subscription is still attached.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }

    /// Number of events this subscriber lost by falling behind.
    #[must_use]
    pub fn missed(&self) -> u64 {
        self.missed
    }

    /// Turn the subscription into a stream of events.
    ///
    /// Dropping the stream detaches the subscriber.
    pub fn into_stream(self) -> impl Stream<Item = Arc<ChatEvent>> + Send + 'static {
        stream::unfold(self, |mut subscription| async move {
            let event = subscription.recv().await?;
            Some((event, subscription))
        })
    }

    fn record_lag(&mut self, skipped: u64) {
        self.missed += skipped;
        warn!(subscriber = self.id, skipped, "Subscriber lagged, dropped oldest events");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
