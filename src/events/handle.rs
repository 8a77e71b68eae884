//! # Subscriptions and the handles callers keep for them.
//!
//! A [`SubscriberHandle`] is the caller-owned token for one subscription. It shares a
//! liveness flag with the bus-side [`Subscriber`] record:
//!
//! ```text
//! subscribe() ──► Subscriber { id, name, alive, call } ──► channel list (bus owned)
//!             └─► SubscriberHandle { id, channel, alive } ──► caller
//!
//! unsubscribe() / shutdown() ──► alive = false
//! ```
//!
//! ## Rules
//! - A publish already in progress skips subscribers whose flag was cleared.
//! - Unsubscribing an invalidated handle is a no-op.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::ListenerError;

/// Type-erased listener callback; the argument is always an `&Event<T>` of the
/// channel's bound payload type.
pub(crate) type ErasedListener = Box<dyn Fn(&dyn Any) -> Result<(), ListenerError> + Send + Sync>;

/// Bus-side record of one subscription.
pub(crate) struct Subscriber {
    pub(crate) id: u64,
    pub(crate) name: Arc<str>,
    alive: Arc<AtomicBool>,
    call: ErasedListener,
}

impl Subscriber {
    pub(crate) fn new(id: u64, name: Arc<str>, call: ErasedListener) -> Self {
        Self {
            id,
            name,
            alive: Arc::new(AtomicBool::new(true)),
            call,
        }
    }

    #[inline]
    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn invalidate(&self) {
        self.alive.store(false, Ordering::Release);
    }

    #[inline]
    pub(crate) fn invoke(&self, event: &dyn Any) -> Result<(), ListenerError> {
        (self.call)(event)
    }

    pub(crate) fn handle(&self, channel: Arc<str>) -> SubscriberHandle {
        SubscriberHandle {
            id: self.id,
            channel,
            alive: Arc::clone(&self.alive),
        }
    }
}

/// Opaque token identifying one subscription.
///
/// Keep it to unsubscribe later. Cloning yields another token for the same
/// subscription; unsubscribing through either invalidates both.
#[derive(Clone)]
pub struct SubscriberHandle {
    id: u64,
    channel: Arc<str>,
    alive: Arc<AtomicBool>,
}

impl SubscriberHandle {
    /// Bus-unique subscription id.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Channel this subscription belongs to.
    #[inline]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// False once unsubscribed or after the bus was shut down.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .field("active", &self.is_active())
            .finish()
    }
}

impl PartialEq for SubscriberHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.alive, &other.alive)
    }
}

impl Eq for SubscriberHandle {}
