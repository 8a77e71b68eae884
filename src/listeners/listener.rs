//! # Core listener trait
//!
//! `Listener<T>` is the extension point for plugging named, stateful handlers into a
//! channel carrying payloads of type `T`. Plain closures are accepted directly by
//! [`EventBus::subscribe`](crate::EventBus::subscribe) and are adapted here.
//!
//! ## Contract
//! - Listeners run synchronously on the publishing thread, in subscription order.
//! - Returning `Err` or panicking is contained by the bus: it is logged and reported,
//!   and the remaining listeners still run.
//! - A listener that blocks, blocks the publisher. There is no timeout.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use gamebus::{Event, EventBus, Listener, ListenerError};
//!
//! struct ScoreTotal(AtomicU64);
//!
//! impl Listener<u64> for ScoreTotal {
//!     fn on_event(&self, ev: &Event<u64>) -> Result<(), ListenerError> {
//!         self.0.fetch_add(ev.payload, Ordering::Relaxed);
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "score-total"
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let total = Arc::new(ScoreTotal(AtomicU64::new(0)));
//! bus.subscribe_listener::<u64, _>("ScoreGained", total.clone()).unwrap();
//! bus.publish("ScoreGained", 40u64).unwrap();
//! bus.publish("ScoreGained", 2u64).unwrap();
//! assert_eq!(total.0.load(Ordering::Relaxed), 42);
//! ```

use std::any::{Any, type_name};

use crate::error::ListenerError;
use crate::events::Event;
use crate::events::handle::ErasedListener;

/// Contract for channel listeners.
pub trait Listener<T>: Send + Sync + 'static {
    /// Handle one event published on the channel this listener is subscribed to.
    fn on_event(&self, event: &Event<T>) -> Result<(), ListenerError>;

    /// Human-readable name (for logs and failure reports).
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Adapts a typed callback into the bus' type-erased form.
///
/// The bus only ever hands an erased listener events of its channel's bound type, so
/// the downcast failing means the channel table is corrupt; it is reported as a
/// listener error rather than a panic.
pub(crate) fn erase<T, F>(f: F) -> ErasedListener
where
    T: Send + Sync + 'static,
    F: Fn(&Event<T>) -> Result<(), ListenerError> + Send + Sync + 'static,
{
    Box::new(move |any: &dyn Any| match any.downcast_ref::<Event<T>>() {
        Some(ev) => f(ev),
        None => Err(format!("listener expected {}", type_name::<Event<T>>()).into()),
    })
}
