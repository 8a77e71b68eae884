//! # Named-channel event bus.
//!
//! [`EventBus`] dispatches typed payloads published under a channel name to every
//! listener currently subscribed to that channel, synchronously, on the caller's thread.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                          Listeners (many per channel):
//!   quest log ──┐                              ┌──► hud        (1st subscribed)
//!   inventory ──┼── publish("ItemCollected") ──┼──► analytics  (2nd)
//!   pickups   ──┘        │                     └──► achievements (3rd)
//!                        ▼
//!             snapshot channel list (lock released)
//!                        │
//!                        └──► invoke each live listener inside catch_unwind
//!                                  └─ Err / panic ──► warn! + ListenerFailure
//!                                                     ──► "bus.listener_failed"
//! ```
//!
//! ## Rules
//! - **FIFO per channel**: listeners run in subscription order; nothing is promised
//!   across channels.
//! - **Snapshot on publish**: listeners may subscribe/unsubscribe (themselves or
//!   others) while a publish is running. New subscribers first see the *next* publish;
//!   unsubscribed ones are skipped from the moment their flag is cleared.
//! - **Fault isolation**: a listener returning `Err` or panicking never stops the
//!   remaining listeners and never surfaces to the publisher.
//! - **No duplicate detection**: subscribing the same callback twice yields two
//!   invocations per publish.
//! - **Typed channels**: the first `subscribe`/`publish`/`declare` binds a channel to
//!   one payload type; later calls with another type fail with `TypeMismatch`.
//! - **Fire-and-forget**: at-most-once delivery to currently subscribed listeners; no
//!   buffering, persistence or redelivery. Publishing to a channel nobody listens to
//!   is a valid no-op.
//!
//! ## Concurrency
//! The channel table sits behind one `RwLock`; listeners are never invoked while it is
//! held, so they may freely call back into the bus. Publishing from several threads is
//! safe; per-channel FIFO then holds per publishing thread.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tracing::{debug, warn};

use crate::config::BusConfig;
use crate::error::{BusError, FailureKind, ListenerError, ListenerFailure};
use crate::listeners::{Listener, erase};

use super::channel::{Channel, validate_name};
use super::event::Event;
use super::handle::{ErasedListener, Subscriber, SubscriberHandle};

type ChannelTable = HashMap<Arc<str>, Channel>;

/// Channel name plus the subscribers captured at publish time.
type Snapshot = (Arc<str>, Vec<Arc<Subscriber>>);

/// Who asked for a publish; only host publishes are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Host,
    Diagnostics,
}

/// Point-in-time delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Accepted host `publish` calls (including ones nobody listened to).
    ///
    /// Failure reports the bus republishes on its diagnostics channel are not counted.
    pub published: u64,
    /// Listener invocations that returned `Ok`, diagnostics listeners included.
    pub delivered: u64,
    /// Listener invocations that returned `Err` or panicked, diagnostics listeners included.
    pub failed: u64,
}

struct Inner {
    cfg: BusConfig,
    channels: RwLock<ChannelTable>,
    next_id: AtomicU64,
    closed: AtomicBool,
    published: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl Inner {
    fn read(&self) -> RwLockReadGuard<'_, ChannelTable> {
        self.channels.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ChannelTable> {
        self.channels.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Removes subscription `id` from `channel`; false when either is unknown.
    fn remove(&self, channel: &str, id: u64) -> bool {
        let removed = match self.write().get_mut(channel) {
            Some(ch) => ch.remove(id),
            None => false,
        };
        if !removed && self.is_closed() {
            debug!(channel, subscriber_id = id, "unsubscribe after shutdown ignored");
        }
        removed
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let channels = self.channels.get_mut().unwrap_or_else(PoisonError::into_inner);
        for ch in channels.values() {
            for sub in &ch.subscribers {
                sub.invalidate();
            }
        }
    }
}

/// Process-wide (but explicitly owned) publish/subscribe dispatcher.
///
/// Cheap to clone: clones share the same channel table. Construct one at session
/// start and hand clones to the components that publish or listen.
///
/// # Example
/// ```
/// use std::sync::{Arc, Mutex};
/// use gamebus::{Event, EventBus};
///
/// #[derive(Debug, Clone)]
/// struct PlayerDied { final_score: u32, cause: &'static str }
///
/// let bus = EventBus::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = seen.clone();
/// let handle = bus
///     .subscribe("PlayerDied", move |ev: &Event<PlayerDied>| {
///         sink.lock().unwrap().push(ev.payload.final_score);
///     })
///     .unwrap();
///
/// bus.publish("PlayerDied", PlayerDied { final_score: 1200, cause: "lava" }).unwrap();
/// bus.unsubscribe("PlayerDied", &handle).unwrap();
/// bus.publish("PlayerDied", PlayerDied { final_score: 10, cause: "fall" }).unwrap();
///
/// assert_eq!(*seen.lock().unwrap(), vec![1200]);
/// ```
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    /// Creates a bus with [`BusConfig::default`].
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Creates a bus with the given configuration.
    pub fn with_config(cfg: BusConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                cfg,
                channels: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                published: AtomicU64::new(0),
                delivered: AtomicU64::new(0),
                failed: AtomicU64::new(0),
            }),
        }
    }

    /// Configuration this bus was built with.
    pub fn config(&self) -> &BusConfig {
        &self.inner.cfg
    }

    /// Binds `channel` to payload type `T` without subscribing.
    ///
    /// Succeeds if the channel is unbound or already carries `T`.
    pub fn declare<T: Send + Sync + 'static>(&self, channel: &str) -> Result<(), BusError> {
        validate_name(channel)?;
        let mut channels = self.inner.write();
        if self.inner.is_closed() {
            return Err(BusError::Closed);
        }
        bind::<T>(&mut channels, channel).map(|_| ())
    }

    /// Subscribes a closure to `channel`.
    ///
    /// The listener is appended to the channel's list (the channel is created and
    /// bound to `T` if absent). No duplicate detection is performed.
    pub fn subscribe<T, F>(&self, channel: &str, f: F) -> Result<SubscriberHandle, BusError>
    where
        T: Send + Sync + 'static,
        F: Fn(&Event<T>) + Send + Sync + 'static,
    {
        let call = erase(move |ev: &Event<T>| {
            f(ev);
            Ok(())
        });
        self.attach::<T>(channel, Arc::from(type_name::<F>()), call)
    }

    /// Subscribes a closure that may fail; errors are contained and reported.
    pub fn subscribe_fallible<T, F>(
        &self,
        channel: &str,
        f: F,
    ) -> Result<SubscriberHandle, BusError>
    where
        T: Send + Sync + 'static,
        F: Fn(&Event<T>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.attach::<T>(channel, Arc::from(type_name::<F>()), erase(f))
    }

    /// Subscribes a named [`Listener`].
    pub fn subscribe_listener<T, L>(
        &self,
        channel: &str,
        listener: Arc<L>,
    ) -> Result<SubscriberHandle, BusError>
    where
        T: Send + Sync + 'static,
        L: Listener<T> + ?Sized,
    {
        let name = Arc::from(listener.name());
        let call = erase(move |ev: &Event<T>| listener.on_event(ev));
        self.attach::<T>(channel, name, call)
    }

    /// Subscribes a closure and returns a guard that unsubscribes when dropped.
    pub fn subscribe_scoped<T, F>(&self, channel: &str, f: F) -> Result<Subscription, BusError>
    where
        T: Send + Sync + 'static,
        F: Fn(&Event<T>) + Send + Sync + 'static,
    {
        let handle = self.subscribe(channel, f)?;
        Ok(Subscription {
            bus: Arc::downgrade(&self.inner),
            handle,
            armed: true,
        })
    }

    /// Removes one subscription.
    ///
    /// Returns `Ok(true)` if it was removed, `Ok(false)` if the channel or handle is
    /// unknown, the handle was already unsubscribed, or the bus was shut down.
    /// Only a malformed channel name is an error.
    pub fn unsubscribe(&self, channel: &str, handle: &SubscriberHandle) -> Result<bool, BusError> {
        validate_name(channel)?;
        Ok(self.inner.remove(channel, handle.id()))
    }

    /// Publishes `payload` on `channel`.
    ///
    /// Every live listener captured in the publish-time snapshot is invoked, in
    /// subscription order. Listener failures are contained; the only errors are
    /// call-site ones (`InvalidArgument`, `TypeMismatch`). After [`shutdown`](Self::shutdown)
    /// this is a no-op.
    pub fn publish<T>(&self, channel: &str, payload: T) -> Result<(), BusError>
    where
        T: Send + Sync + 'static,
    {
        self.emit(channel, payload, Origin::Host)
    }

    /// Number of live listeners on `channel` (0 for unknown channels).
    pub fn listener_count(&self, channel: &str) -> usize {
        self.inner
            .read()
            .get(channel)
            .map(|ch| ch.subscribers.iter().filter(|s| s.is_alive()).count())
            .unwrap_or(0)
    }

    /// Returns sorted list of known channel names.
    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().keys().map(|k| k.to_string()).collect();
        names.sort_unstable();
        names
    }

    /// Delivery counters since creation.
    pub fn stats(&self) -> BusStats {
        BusStats {
            published: self.inner.published.load(Ordering::Relaxed),
            delivered: self.inner.delivered.load(Ordering::Relaxed),
            failed: self.inner.failed.load(Ordering::Relaxed),
        }
    }

    /// True after [`shutdown`](Self::shutdown).
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Tears the bus down: invalidates every handle and drops all channels.
    ///
    /// Later subscriptions fail with [`BusError::Closed`], publishes become no-ops and
    /// unsubscribes stay harmless. Idempotent.
    pub fn shutdown(&self) {
        let drained: Vec<Channel> = {
            let mut channels = self.inner.write();
            self.inner.closed.store(true, Ordering::Release);
            channels.drain().map(|(_, ch)| ch).collect()
        };
        for ch in &drained {
            for sub in &ch.subscribers {
                sub.invalidate();
            }
        }
        debug!(channels = drained.len(), "event bus shut down");
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    fn emit<T>(&self, channel: &str, payload: T, origin: Origin) -> Result<(), BusError>
    where
        T: Send + Sync + 'static,
    {
        validate_name(channel)?;
        let Some((name, subscribers)) = self.snapshot::<T>(channel)? else {
            debug!(channel, "publish after shutdown dropped");
            return Ok(());
        };
        if origin == Origin::Host {
            self.inner.published.fetch_add(1, Ordering::Relaxed);
        }

        if subscribers.is_empty() {
            debug!(channel, "publish with no listeners");
            return Ok(());
        }

        let event = Event::new(name, payload);
        self.dispatch(&event, &subscribers);
        Ok(())
    }

    fn attach<T: Send + Sync + 'static>(
        &self,
        channel: &str,
        name: Arc<str>,
        call: ErasedListener,
    ) -> Result<SubscriberHandle, BusError> {
        validate_name(channel)?;
        let mut channels = self.inner.write();
        if self.inner.is_closed() {
            return Err(BusError::Closed);
        }
        let ch = bind::<T>(&mut channels, channel)?;
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let sub = Arc::new(Subscriber::new(id, name, call));
        let handle = sub.handle(Arc::clone(&ch.name));
        ch.subscribers.push(sub);
        Ok(handle)
    }

    /// Copies the channel's subscriber list; `None` once the bus is closed.
    fn snapshot<T: 'static>(&self, channel: &str) -> Result<Option<Snapshot>, BusError> {
        {
            let channels = self.inner.read();
            if self.inner.is_closed() {
                return Ok(None);
            }
            if let Some(ch) = channels.get(channel) {
                ch.check::<T>()?;
                return Ok(Some((Arc::clone(&ch.name), ch.subscribers.clone())));
            }
        }

        let mut channels = self.inner.write();
        if self.inner.is_closed() {
            return Ok(None);
        }
        let ch = bind::<T>(&mut channels, channel)?;
        Ok(Some((Arc::clone(&ch.name), ch.subscribers.clone())))
    }

    fn dispatch<T>(&self, event: &Event<T>, subscribers: &[Arc<Subscriber>])
    where
        T: Send + Sync + 'static,
    {
        for sub in subscribers {
            if !sub.is_alive() {
                continue;
            }

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| sub.invoke(event as &dyn Any)));
            let (kind, reason) = match outcome {
                Ok(Ok(())) => {
                    self.inner.delivered.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
                Ok(Err(err)) => (FailureKind::Error, err.to_string()),
                Err(panic_err) => (FailureKind::Panic, panic_message(panic_err.as_ref())),
            };

            self.inner.failed.fetch_add(1, Ordering::Relaxed);
            self.report(ListenerFailure {
                channel: Arc::clone(&event.channel),
                listener: Arc::clone(&sub.name),
                subscriber_id: sub.id,
                seq: event.seq,
                kind,
                reason,
            });
        }
    }

    /// Logs a contained failure and republishes it on the diagnostics channel.
    ///
    /// Failures of diagnostics listeners are only logged (no feedback loop).
    fn report(&self, failure: ListenerFailure) {
        warn!(
            channel = %failure.channel,
            listener = %failure.listener,
            subscriber_id = failure.subscriber_id,
            seq = failure.seq,
            kind = failure.kind.as_str(),
            reason = %failure.reason,
            "listener failed"
        );

        let Some(diag) = self.inner.cfg.failure_channel_name() else {
            return;
        };
        if *failure.channel == *diag {
            return;
        }
        if let Err(err) = self.emit(diag, failure, Origin::Diagnostics) {
            warn!(channel = diag, error = %err, "could not report listener failure");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("channels", &self.inner.read().len())
            .field("closed", &self.is_closed())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Creates `name` bound to `T` if absent, then checks the binding.
fn bind<'a, T: 'static>(
    channels: &'a mut ChannelTable,
    name: &str,
) -> Result<&'a mut Channel, BusError> {
    let key: Arc<str> = Arc::from(name);
    let ch = channels
        .entry(Arc::clone(&key))
        .or_insert_with(|| Channel::bound_to::<T>(key));
    ch.check::<T>()?;
    Ok(ch)
}

fn panic_message(any: &(dyn Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Scoped subscription: unsubscribes when dropped.
///
/// The RAII form of the enable/disable pairing hosts must otherwise do by hand.
/// Dropping it after the bus is gone is harmless.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    bus: Weak<Inner>,
    handle: SubscriberHandle,
    armed: bool,
}

impl Subscription {
    /// The underlying handle.
    pub fn handle(&self) -> &SubscriberHandle {
        &self.handle
    }

    /// Keeps the subscription alive past this guard, returning its plain handle.
    pub fn detach(mut self) -> SubscriberHandle {
        self.armed = false;
        self.handle.clone()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("handle", &self.handle)
            .field("armed", &self.armed)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(inner) = self.bus.upgrade() {
            inner.remove(self.handle.channel(), self.handle.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::thread;

    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    fn log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn recorder(log: &Log, tag: &'static str) -> impl Fn(&Event<u32>) + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |_ev: &Event<u32>| log.lock().unwrap().push(tag.to_string())
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn test_listeners_run_in_subscription_order() {
        let bus = EventBus::new();
        let seen = log();
        bus.subscribe("tick", recorder(&seen, "A")).unwrap();
        bus.subscribe("tick", recorder(&seen, "B")).unwrap();
        bus.subscribe("tick", recorder(&seen, "C")).unwrap();

        bus.publish("tick", 1u32).unwrap();

        assert_eq!(entries(&seen), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let bus = EventBus::new();
        let seen = log();
        bus.subscribe("tick", recorder(&seen, "A-ran")).unwrap();
        bus.subscribe("tick", |_ev: &Event<u32>| panic!("boom")).unwrap();
        bus.subscribe_fallible("tick", |_ev: &Event<u32>| Err("nope".into()))
            .unwrap();
        bus.subscribe("tick", recorder(&seen, "C-ran")).unwrap();

        let result = bus.publish("tick", 7u32);

        assert!(result.is_ok(), "publish must not surface listener failures");
        assert_eq!(entries(&seen), vec!["A-ran", "C-ran"]);
        let stats = bus.stats();
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.failed, 2);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let bus = EventBus::new();
        let seen = log();
        let a = bus.subscribe("tick", recorder(&seen, "A")).unwrap();

        assert_eq!(bus.unsubscribe("tick", &a), Ok(true));
        bus.publish("tick", 1u32).unwrap();
        assert!(entries(&seen).is_empty());
        assert!(!a.is_active());

        assert_eq!(bus.unsubscribe("tick", &a), Ok(false));
        assert_eq!(bus.unsubscribe("never-used", &a), Ok(false));
    }

    #[test]
    fn test_blank_channel_names_are_rejected() {
        let bus = EventBus::new();
        assert!(matches!(
            bus.subscribe("", |_ev: &Event<u32>| {}),
            Err(BusError::InvalidArgument { .. })
        ));
        assert!(matches!(
            bus.publish(" ", 1u32),
            Err(BusError::InvalidArgument { .. })
        ));
        let h = bus.subscribe("ok", |_ev: &Event<u32>| {}).unwrap();
        assert!(matches!(
            bus.unsubscribe("", &h),
            Err(BusError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_payload_type_is_bound_per_channel() {
        let bus = EventBus::new();
        bus.subscribe("score", |_ev: &Event<u32>| {}).unwrap();

        assert!(matches!(
            bus.publish("score", "text"),
            Err(BusError::TypeMismatch { .. })
        ));
        assert!(matches!(
            bus.subscribe("score", |_ev: &Event<i64>| {}),
            Err(BusError::TypeMismatch { .. })
        ));

        bus.declare::<String>("chat").unwrap();
        assert!(bus.declare::<String>("chat").is_ok());
        assert!(bus.publish("chat", 5u8).is_err());
    }

    #[test]
    fn test_publish_without_listeners_is_noop() {
        let bus = EventBus::new();
        assert!(bus.publish("GameStarted", ()).is_ok());
        assert_eq!(bus.channels(), vec!["GameStarted".to_string()]);
        assert_eq!(bus.listener_count("GameStarted"), 0);
        assert_eq!(bus.stats().published, 1);
    }

    #[test]
    fn test_duplicate_subscription_runs_twice() {
        let bus = EventBus::new();
        let seen = log();
        let listener = recorder(&seen, "L");
        let shared = Arc::new(listener);
        let a = Arc::clone(&shared);
        let b = Arc::clone(&shared);
        bus.subscribe("tick", move |ev: &Event<u32>| (*a)(ev)).unwrap();
        bus.subscribe("tick", move |ev: &Event<u32>| (*b)(ev)).unwrap();

        bus.publish("tick", 0u32).unwrap();
        assert_eq!(entries(&seen), vec!["L", "L"]);
    }

    #[test]
    fn test_unsubscribe_during_publish_skips_target() {
        let bus = EventBus::new();
        let seen = log();
        let victim: Arc<Mutex<Option<SubscriberHandle>>> = Arc::new(Mutex::new(None));

        let bus_in = bus.clone();
        let slot = Arc::clone(&victim);
        let first = Arc::clone(&seen);
        bus.subscribe("tick", move |_ev: &Event<u32>| {
            first.lock().unwrap().push("killer".into());
            if let Some(h) = slot.lock().unwrap().take() {
                bus_in.unsubscribe("tick", &h).unwrap();
            }
        })
        .unwrap();
        let h = bus.subscribe("tick", recorder(&seen, "victim")).unwrap();
        bus.subscribe("tick", recorder(&seen, "last")).unwrap();
        *victim.lock().unwrap() = Some(h);

        bus.publish("tick", 1u32).unwrap();

        assert_eq!(entries(&seen), vec!["killer", "last"]);
        assert_eq!(bus.listener_count("tick"), 2);
    }

    #[test]
    fn test_listener_can_unsubscribe_itself_and_subscribe_others() {
        let bus = EventBus::new();
        let seen = log();
        let me: Arc<Mutex<Option<SubscriberHandle>>> = Arc::new(Mutex::new(None));

        let bus_in = bus.clone();
        let slot = Arc::clone(&me);
        let sink = Arc::clone(&seen);
        let late = Arc::clone(&seen);
        let handle = bus
            .subscribe("tick", move |_ev: &Event<u32>| {
                sink.lock().unwrap().push("once".into());
                if let Some(h) = slot.lock().unwrap().take() {
                    bus_in.unsubscribe("tick", &h).unwrap();
                    let late = Arc::clone(&late);
                    bus_in
                        .subscribe("tick", move |_ev: &Event<u32>| {
                            late.lock().unwrap().push("late".into())
                        })
                        .unwrap();
                }
            })
            .unwrap();
        *me.lock().unwrap() = Some(handle);

        bus.publish("tick", 1u32).unwrap();
        assert_eq!(entries(&seen), vec!["once"]);

        bus.publish("tick", 2u32).unwrap();
        assert_eq!(entries(&seen), vec!["once", "late"]);
    }

    #[test]
    fn test_failures_are_reported_on_diagnostics_channel() {
        let bus = EventBus::new();
        let reports: Arc<Mutex<Vec<ListenerFailure>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);
        bus.subscribe(
            crate::config::LISTENER_FAILED_CHANNEL,
            move |ev: &Event<ListenerFailure>| sink.lock().unwrap().push(ev.payload.clone()),
        )
        .unwrap();
        let bad = bus
            .subscribe("ItemCollected", |_ev: &Event<u32>| panic!("bad item"))
            .unwrap();

        bus.publish("ItemCollected", 3u32).unwrap();

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(&*reports[0].channel, "ItemCollected");
        assert_eq!(reports[0].subscriber_id, bad.id());
        assert_eq!(reports[0].kind, FailureKind::Panic);
        assert_eq!(reports[0].reason, "bad item");
    }

    #[test]
    fn test_failing_diagnostics_listener_is_not_republished() {
        let bus = EventBus::new();
        bus.subscribe(
            crate::config::LISTENER_FAILED_CHANNEL,
            |_ev: &Event<ListenerFailure>| panic!("diag broke"),
        )
        .unwrap();
        bus.subscribe("tick", |_ev: &Event<u32>| panic!("tick broke"))
            .unwrap();

        bus.publish("tick", 1u32).unwrap();

        // one for the tick listener, one for the diagnostics listener, then stop
        assert_eq!(bus.stats().failed, 2);
    }

    #[test]
    fn test_stats_count_host_publishes_only() {
        let bus = EventBus::new();
        bus.subscribe(
            crate::config::LISTENER_FAILED_CHANNEL,
            |_ev: &Event<ListenerFailure>| {},
        )
        .unwrap();
        bus.subscribe("tick", |_ev: &Event<u32>| panic!("tick broke"))
            .unwrap();

        bus.publish("tick", 1u32).unwrap();

        assert_eq!(
            bus.stats(),
            BusStats {
                published: 1,
                delivered: 1,
                failed: 1,
            }
        );
    }

    #[test]
    fn test_reporting_can_be_disabled() {
        let bus = EventBus::with_config(BusConfig {
            report_failures: false,
            ..BusConfig::default()
        });
        bus.subscribe("tick", |_ev: &Event<u32>| panic!("x")).unwrap();
        bus.publish("tick", 1u32).unwrap();
        assert_eq!(bus.channels(), vec!["tick".to_string()]);
    }

    #[test]
    fn test_shutdown_invalidates_handles() {
        let bus = EventBus::new();
        let seen = log();
        let h = bus.subscribe("tick", recorder(&seen, "A")).unwrap();

        bus.shutdown();

        assert!(bus.is_closed());
        assert!(!h.is_active());
        assert_eq!(bus.unsubscribe("tick", &h), Ok(false));
        assert!(bus.publish("tick", 1u32).is_ok());
        assert!(entries(&seen).is_empty());
        assert!(matches!(
            bus.subscribe("tick", |_ev: &Event<u32>| {}),
            Err(BusError::Closed)
        ));
        assert!(bus.channels().is_empty());
    }

    #[test]
    fn test_dropping_last_bus_clone_invalidates_handles() {
        let bus = EventBus::new();
        let h = bus.subscribe("tick", |_ev: &Event<u32>| {}).unwrap();
        drop(bus);
        assert!(!h.is_active());
    }

    #[test]
    fn test_scoped_subscription_unsubscribes_on_drop() {
        let bus = EventBus::new();
        let seen = log();
        {
            let _guard = bus.subscribe_scoped("tick", recorder(&seen, "scoped")).unwrap();
            bus.publish("tick", 1u32).unwrap();
        }
        bus.publish("tick", 2u32).unwrap();
        assert_eq!(entries(&seen), vec!["scoped"]);

        let guard = bus.subscribe_scoped("tick", recorder(&seen, "kept")).unwrap();
        let handle = guard.detach();
        bus.publish("tick", 3u32).unwrap();
        assert!(handle.is_active());
        assert_eq!(entries(&seen), vec!["scoped", "kept"]);
    }

    #[test]
    fn test_events_carry_channel_and_increasing_seq() {
        let bus = EventBus::new();
        let seqs: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seqs);
        bus.subscribe("tick", move |ev: &Event<u32>| {
            assert_eq!(&*ev.channel, "tick");
            sink.lock().unwrap().push(ev.seq);
        })
        .unwrap();

        bus.publish("tick", 1u32).unwrap();
        bus.publish("tick", 2u32).unwrap();

        let seqs = seqs.lock().unwrap();
        assert_eq!(seqs.len(), 2);
        assert!(seqs[0] < seqs[1]);
    }

    #[test]
    fn test_concurrent_publishers_deliver_everything() {
        let bus = EventBus::new();
        let total = Arc::new(AtomicU64::new(0));
        let sink = Arc::clone(&total);
        bus.subscribe("score", move |ev: &Event<u64>| {
            sink.fetch_add(ev.payload, Ordering::Relaxed);
        })
        .unwrap();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let bus = bus.clone();
                thread::spawn(move || {
                    for _ in 0..250 {
                        bus.publish("score", 1u64).unwrap();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        assert_eq!(total.load(Ordering::Relaxed), 1000);
        assert_eq!(bus.stats().published, 1000);
    }
}
