//! # Per-entity stat registry with an aggregate danger flag.
//!
//! A [`StatRegistry`] owns the named stats of one entity (one character, one vehicle...)
//! and turns their individual critical transitions into a single entity-level event on
//! an [`EventBus`].
//!
//! ## Architecture
//! ```text
//! hunger ──┐ CriticalEntered / CriticalExited
//! thirst ──┼────────────────────────────────► DangerTracker { critical: {names} }
//! stamina ─┘                                          │
//! health  (designated, not aggregated)                │ empty <-> non-empty edge
//!                                                     ▼
//!                          bus.publish("EntityCriticalStateChanged", { entity, critical, .. })
//! ```
//!
//! ## Rules
//! - Stat names are non-empty and unique within one registry.
//! - "In danger" is true iff any stat other than the designated health stat is critical.
//! - The event is published only on edges of that flag: the first stat going critical
//!   publishes `critical = true`, the last one recovering publishes `critical = false`.
//! - The wiring lives in each stat's observers, so mutating through
//!   [`get_stat_mut`](StatRegistry::get_stat_mut) is tracked as well.
//! - Events are published synchronously by default. While
//!   [deferred](StatRegistry::set_deferred), they queue up instead and go out through
//!   [`PendingEvents::publish`], typically after the caller released the lock that
//!   guards a shared registry, so listeners may read the registry again.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{BusError, StatError};
use crate::events::EventBus;

use super::bounded::{BoundedStat, StatChange, StatEvent};
use super::snapshot::RegistrySnapshot;

/// Channel carrying [`EntityCriticalStateChanged`] payloads.
pub const ENTITY_CRITICAL_STATE_CHANGED: &str = "EntityCriticalStateChanged";

/// Published when an entity's aggregate danger flag flips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCriticalStateChanged {
    /// Owning entity.
    pub entity: String,
    /// New value of the flag.
    pub critical: bool,
    /// Non-health stats critical after the transition (sorted).
    pub critical_stats: Vec<String>,
}

/// A publish captured while the registry was deferring events.
type Deferred = Box<dyn FnOnce(&EventBus) -> Result<(), BusError> + Send>;

#[derive(Default)]
struct Outbox {
    deferred: bool,
    queue: Vec<(&'static str, Deferred)>,
}

/// Bus events queued by a deferring [`StatRegistry`], in emission order.
#[must_use = "pending events are lost unless published"]
pub struct PendingEvents {
    bus: EventBus,
    queue: Vec<(&'static str, Deferred)>,
}

impl PendingEvents {
    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Channels of the queued events, in order.
    pub fn channels(&self) -> Vec<&'static str> {
        self.queue.iter().map(|(channel, _)| *channel).collect()
    }

    /// Publishes every queued event in order; returns how many were accepted.
    ///
    /// Publish errors are logged and do not stop the rest.
    pub fn publish(self) -> usize {
        let mut sent = 0;
        for (channel, send) in self.queue {
            match send(&self.bus) {
                Ok(()) => sent += 1,
                Err(err) => error!(channel, error = %err, "could not publish deferred event"),
            }
        }
        sent
    }
}

impl std::fmt::Debug for PendingEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingEvents")
            .field("channels", &self.channels())
            .finish()
    }
}

/// Shared between the registry and the observers it installs on its stats.
struct DangerTracker {
    entity: Arc<str>,
    bus: EventBus,
    critical: Mutex<BTreeSet<String>>,
    outbox: Mutex<Outbox>,
}

impl DangerTracker {
    fn mark(&self, stat: &str, critical: bool) {
        let edge = {
            let mut set = self.critical.lock().unwrap_or_else(PoisonError::into_inner);
            let was = !set.is_empty();
            if critical {
                set.insert(stat.to_string());
            } else {
                set.remove(stat);
            }
            let now = !set.is_empty();
            (was != now).then(|| EntityCriticalStateChanged {
                entity: self.entity.to_string(),
                critical: now,
                critical_stats: set.iter().cloned().collect(),
            })
        };

        let Some(payload) = edge else {
            return;
        };
        debug!(
            entity = %self.entity,
            critical = payload.critical,
            stat,
            "entity danger flag flipped"
        );
        self.emit(ENTITY_CRITICAL_STATE_CHANGED, payload);
    }

    /// Publishes now, or queues while deferred.
    fn emit<T: Send + Sync + 'static>(&self, channel: &'static str, payload: T) {
        {
            let mut outbox = self.outbox.lock().unwrap_or_else(PoisonError::into_inner);
            if outbox.deferred {
                let send: Deferred = Box::new(move |bus: &EventBus| bus.publish(channel, payload));
                outbox.queue.push((channel, send));
                return;
            }
        }
        if let Err(err) = self.bus.publish(channel, payload) {
            error!(
                entity = %self.entity,
                channel,
                error = %err,
                "could not publish registry event"
            );
        }
    }

    fn snapshot(&self) -> Vec<String> {
        self.critical
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

/// Named stats of one entity.
pub struct StatRegistry {
    entity: Arc<str>,
    health: String,
    stats: BTreeMap<String, BoundedStat>,
    tracker: Arc<DangerTracker>,
}

impl StatRegistry {
    /// Creates an empty registry for `entity`.
    ///
    /// `health_stat` names the stat excluded from the danger aggregate (it may be
    /// added later, or never).
    pub fn new(
        entity: impl Into<Arc<str>>,
        health_stat: impl Into<String>,
        bus: EventBus,
    ) -> Self {
        let entity = entity.into();
        Self {
            entity: Arc::clone(&entity),
            health: health_stat.into(),
            stats: BTreeMap::new(),
            tracker: Arc::new(DangerTracker {
                entity,
                bus,
                critical: Mutex::new(BTreeSet::new()),
                outbox: Mutex::new(Outbox::default()),
            }),
        }
    }

    /// Owning entity.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Name of the designated health stat.
    pub fn health_stat(&self) -> &str {
        &self.health
    }

    /// Bus this registry publishes on.
    pub fn bus(&self) -> &EventBus {
        &self.tracker.bus
    }

    /// Switches deferred publishing on or off.
    ///
    /// While on, every bus event this registry would publish is queued instead; drain
    /// the queue with [`take_pending`](Self::take_pending). Turning it off does not
    /// flush what is already queued.
    pub fn set_deferred(&mut self, deferred: bool) {
        self.tracker
            .outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .deferred = deferred;
    }

    /// True while events are being queued.
    pub fn is_deferred(&self) -> bool {
        self.tracker
            .outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .deferred
    }

    /// Takes every queued event, leaving the queue empty.
    pub fn take_pending(&mut self) -> PendingEvents {
        let queue = std::mem::take(
            &mut self
                .tracker
                .outbox
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .queue,
        );
        PendingEvents {
            bus: self.tracker.bus.clone(),
            queue,
        }
    }

    /// Publishes `payload` on this registry's bus for the owning entity, honouring
    /// deferred mode.
    pub(crate) fn emit<T: Send + Sync + 'static>(&self, channel: &'static str, payload: T) {
        self.tracker.emit(channel, payload);
    }

    /// Adds `stat` under `name`.
    ///
    /// A non-health stat that is already critical counts towards the aggregate
    /// immediately (and may publish the `true` edge).
    pub fn add_stat(
        &mut self,
        name: impl Into<String>,
        mut stat: BoundedStat,
    ) -> Result<(), StatError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(StatError::invalid("stat name must not be empty"));
        }
        if self.stats.contains_key(&name) {
            return Err(StatError::DuplicateStat { name });
        }

        if name != self.health {
            let tracker = Arc::clone(&self.tracker);
            let stat_name = name.clone();
            stat.observe(move |ev| match ev {
                StatEvent::CriticalEntered { .. } => tracker.mark(&stat_name, true),
                StatEvent::CriticalExited { .. } => tracker.mark(&stat_name, false),
                _ => {}
            });
            if stat.is_critical() {
                self.tracker.mark(&name, true);
            }
        }

        self.stats.insert(name, stat);
        Ok(())
    }

    /// Looks up a stat.
    pub fn get_stat(&self, name: &str) -> Result<&BoundedStat, StatError> {
        self.stats.get(name).ok_or_else(|| StatError::NotFound {
            name: name.to_string(),
        })
    }

    /// Looks up a stat for mutation.
    pub fn get_stat_mut(&mut self, name: &str) -> Result<&mut BoundedStat, StatError> {
        self.stats.get_mut(name).ok_or_else(|| StatError::NotFound {
            name: name.to_string(),
        })
    }

    /// True if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.stats.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.stats.keys().cloned().collect()
    }

    /// Shorthand for `get_stat_mut(name)?.apply_delta(amount)`.
    pub fn apply_delta(&mut self, name: &str, amount: f32) -> Result<StatChange, StatError> {
        Ok(self.get_stat_mut(name)?.apply_delta(amount))
    }

    /// Shorthand for `get_stat_mut(name)?.set_value(value)`.
    pub fn set_value(&mut self, name: &str, value: f32) -> Result<StatChange, StatError> {
        Ok(self.get_stat_mut(name)?.set_value(value))
    }

    /// Current value of `name`.
    pub fn value(&self, name: &str) -> Result<f32, StatError> {
        Ok(self.get_stat(name)?.value())
    }

    /// Applies each stat's stored decay for `dt` seconds; returns the changes by name.
    pub fn tick_all(&mut self, dt: f32) -> Result<Vec<(String, StatChange)>, StatError> {
        let mut changes = Vec::with_capacity(self.stats.len());
        for (name, stat) in self.stats.iter_mut() {
            if stat.decay_rate() > 0.0 {
                changes.push((name.clone(), stat.tick_decay(dt)?));
            }
        }
        Ok(changes)
    }

    /// Aggregate flag: any non-health stat is critical.
    pub fn is_in_danger(&self) -> bool {
        !self.tracker.snapshot().is_empty()
    }

    /// Non-health stats currently critical, sorted.
    pub fn critical_stats(&self) -> Vec<String> {
        self.tracker.snapshot()
    }

    /// Captures every stat value for a host-side save.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            entity: self.entity.to_string(),
            values: self
                .stats
                .iter()
                .map(|(name, stat)| (name.clone(), stat.value()))
                .collect(),
        }
    }

    /// Restores values captured by [`snapshot`](Self::snapshot).
    ///
    /// Every name is validated first; on `NotFound` nothing is applied. Values go
    /// through `set_value`, so clamping and notifications apply as usual.
    pub fn restore(&mut self, snapshot: &RegistrySnapshot) -> Result<(), StatError> {
        if let Some(missing) = snapshot.values.keys().find(|n| !self.stats.contains_key(*n)) {
            return Err(StatError::NotFound {
                name: missing.clone(),
            });
        }
        for (name, value) in &snapshot.values {
            self.set_value(name, *value)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for StatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatRegistry")
            .field("entity", &self.entity)
            .field("health", &self.health)
            .field("stats", &self.stats)
            .field("critical", &self.tracker.snapshot())
            .finish()
    }
}
