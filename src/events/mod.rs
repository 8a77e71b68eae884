//! Named-channel event bus.
//!
//! This module groups the event **envelope**, the per-channel **subscriber lists**
//! and the **bus** that delivers payloads to them synchronously, in subscription order.
//!
//! ## Contents
//! - [`Event`] payload plus delivery metadata (`seq`, `at`, `channel`)
//! - [`EventBus`] clonable handle: subscribe / unsubscribe / publish
//! - [`SubscriberHandle`] stable identity of one subscription
//! - [`Subscription`] RAII guard that unsubscribes on drop
//!
//! ## Quick reference
//! - **Publishers**: host game code, [`StatRegistry`](crate::StatRegistry),
//!   [`SurvivalSystem`](crate::SurvivalSystem), the bus itself (listener failures).
//! - **Consumers**: closures and [`Listener`](crate::Listener) implementations.

mod bus;
mod channel;
mod event;
pub(crate) mod handle;

pub use bus::{BusStats, EventBus, Subscription};
pub use event::Event;
pub use handle::SubscriberHandle;
