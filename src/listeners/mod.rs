//! # Channel listeners.
//!
//! This module provides the [`Listener`] trait and built-in implementations for
//! handling events published on an [`EventBus`](crate::EventBus) channel.
//!
//! ## Listener types
//! - **Closures** - `Fn(&Event<T>)` or `Fn(&Event<T>) -> Result<(), ListenerError>`,
//!   passed straight to `subscribe` / `subscribe_fallible`
//! - **Named listeners** - types implementing [`Listener<T>`], subscribed through
//!   `subscribe_listener`; their `name()` shows up in failure reports
//!
//! ## Architecture
//! ```text
//! publish(channel, payload)
//!     │
//!     └──► Event<T> ──► snapshot of channel subscribers (FIFO)
//!                          ├──► closure A
//!                          ├──► Listener::on_event (B)  ── Err / panic ──► ListenerFailure
//!                          └──► closure C
//! ```

#[cfg(feature = "logging")]
mod log;
mod listener;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use listener::Listener;

pub(crate) use listener::erase;
