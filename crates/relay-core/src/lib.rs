//! # relay-core
//!
//! In-process event engine for the Relay chat server.
//!
//! This crate provides the building blocks that every transport adapter
//! calls into:
//!
//! - **Event** - Immutable chat events (message, join, leave)
//! - **Presence** - Concurrent registry of connected usernames
//! - **Bus** - Multicast channel with attach-anytime, no-replay subscribers
//! - **Relay** - Composes presence and bus into the chat operations
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐
//! │   Adapter   │────▶│    Relay    │────▶│ BroadcastBus │──▶ Subscriptions
//! └─────────────┘     └─────────────┘     └──────────────┘
//!                            │
//!                            ▼
//!                     ┌──────────────────┐
//!                     │ PresenceRegistry │
//!                     └──────────────────┘
//! ```

pub mod bus;
pub mod event;
pub mod presence;
pub mod relay;

pub use bus::{BroadcastBus, Subscription, SubscriberId};
pub use event::{ChatEvent, EventKind};
pub use presence::PresenceRegistry;
pub use relay::{ChatRelay, RelayConfig, RelayError, RelayStats};
