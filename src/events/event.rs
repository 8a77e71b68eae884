//! # Event envelope delivered to listeners.
//!
//! Every `publish` wraps its payload in an [`Event`] that carries the channel
//! name, a wall-clock timestamp and a global sequence number.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically
//! across all channels of all buses in the process. Within one channel, listeners see
//! events in publish order; across channels, use `seq` to restore the order.
//!
//! ## Example
//! ```rust
//! use gamebus::Event;
//!
//! #[derive(Debug)]
//! struct ItemCollected { item: &'static str, value: u32 }
//!
//! let a = Event::new("ItemCollected", ItemCollected { item: "coin", value: 5 });
//! let b = Event::new("ItemCollected", ItemCollected { item: "gem", value: 50 });
//!
//! assert_eq!(&*a.channel, "ItemCollected");
//! assert_eq!(a.payload.value, 5);
//! assert!(b.seq > a.seq);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// A published payload together with its delivery metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock creation timestamp
/// - `channel`: channel the event was published on
/// - `payload`: the immutable, channel-specific value
#[derive(Debug, Clone)]
pub struct Event<T> {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp taken when the event was created.
    pub at: SystemTime,
    /// Channel name.
    pub channel: Arc<str>,
    /// Channel-specific payload.
    pub payload: T,
}

impl<T> Event<T> {
    /// Creates a new event with the current timestamp and the next sequence number.
    pub fn new(channel: impl Into<Arc<str>>, payload: T) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            channel: channel.into(),
            payload,
        }
    }

    /// Borrows the payload.
    #[inline]
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Consumes the envelope, returning the payload.
    #[inline]
    pub fn into_payload(self) -> T {
        self.payload
    }
}
