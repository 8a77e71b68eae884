//! # Clamped numeric stat with edge-triggered notifications.
//!
//! [`BoundedStat`] keeps one quantity (health, hunger, thirst, stamina...) inside
//! `[min, max]` and tells its observers when the value changes and when it crosses the
//! critical threshold or the floor.
//!
//! ## State machine
//! ```text
//!            value <= threshold                value <= min
//!   Normal ─────────────────────► Critical ──────────────────► Depleted
//!     ▲   ◄─────────────────────     ▲    ◄──────────────────     │
//!     │       value > threshold      │         value > min        │
//!     └──────────────────────────────┴────────────────────────────┘
//!              (direct jumps fire every edge they cross)
//! ```
//!
//! ## Rules
//! - `current` is clamped into `[min, max]` after every mutation.
//! - `is_critical() == (current <= threshold)`, `is_depleted() == (current <= min)`.
//! - Notifications are **edge-triggered**: entering/leaving critical and reaching/leaving
//!   the floor fire once per crossing, never while already in that state.
//! - Order within one mutation: `ValueChanged`, then `CriticalEntered`/`CriticalExited`,
//!   then `Depleted`; on recovery `Replenished` precedes `CriticalExited`.
//! - Mutations are total: non-finite inputs are logged and ignored.
//!
//! ## Example
//! ```rust
//! use gamebus::{BoundedStat, StatState};
//!
//! let mut health = BoundedStat::new(0.0, 100.0, 100.0, 20.0).unwrap();
//! let change = health.apply_delta(-85.0);
//! assert_eq!(health.value(), 15.0);
//! assert!(change.entered_critical());
//! assert_eq!(health.state(), StatState::Critical);
//!
//! let change = health.apply_delta(-500.0);
//! assert_eq!(health.value(), 0.0);
//! assert!(change.depleted());
//! assert!(!change.entered_critical());
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::error::StatError;

/// Coarse state derived from the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatState {
    /// Above the critical threshold.
    Normal,
    /// At or below the critical threshold, above `min`.
    Critical,
    /// At `min`.
    Depleted,
}

/// Notification delivered to stat observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatEvent {
    /// The clamped value differs from the previous one.
    ValueChanged {
        /// Value before the mutation.
        previous: f32,
        /// Value after the mutation.
        current: f32,
    },
    /// Crossed the threshold downwards.
    CriticalEntered {
        /// Value after the mutation.
        value: f32,
    },
    /// Crossed the threshold upwards.
    CriticalExited {
        /// Value after the mutation.
        value: f32,
    },
    /// Reached `min`.
    Depleted,
    /// Left `min`.
    Replenished {
        /// Value after the mutation.
        value: f32,
    },
}

/// Outcome of one mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatChange {
    /// Value before the mutation.
    pub previous: f32,
    /// Value after the mutation.
    pub current: f32,
    /// State before the mutation.
    pub from: StatState,
    /// State after the mutation.
    pub to: StatState,
}

impl StatChange {
    fn unchanged(value: f32, state: StatState) -> Self {
        Self {
            previous: value,
            current: value,
            from: state,
            to: state,
        }
    }

    /// The clamped value moved.
    #[inline]
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }

    /// Crossed into critical (including a direct jump to depleted).
    #[inline]
    pub fn entered_critical(&self) -> bool {
        self.from == StatState::Normal && self.to != StatState::Normal
    }

    /// Crossed back above the threshold.
    #[inline]
    pub fn exited_critical(&self) -> bool {
        self.from != StatState::Normal && self.to == StatState::Normal
    }

    /// Reached `min`.
    #[inline]
    pub fn depleted(&self) -> bool {
        self.from != StatState::Depleted && self.to == StatState::Depleted
    }

    /// Left `min`.
    #[inline]
    pub fn replenished(&self) -> bool {
        self.from == StatState::Depleted && self.to != StatState::Depleted
    }

    /// Notifications this change produces, in delivery order.
    pub fn events(&self) -> Vec<StatEvent> {
        let mut out = Vec::with_capacity(3);
        if self.changed() {
            out.push(StatEvent::ValueChanged {
                previous: self.previous,
                current: self.current,
            });
        }
        if self.entered_critical() {
            out.push(StatEvent::CriticalEntered {
                value: self.current,
            });
        }
        if self.replenished() {
            out.push(StatEvent::Replenished {
                value: self.current,
            });
        }
        if self.exited_critical() {
            out.push(StatEvent::CriticalExited {
                value: self.current,
            });
        }
        if self.depleted() {
            out.push(StatEvent::Depleted);
        }
        out
    }
}

/// Identifies one observer for [`BoundedStat::unobserve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(&StatEvent) + Send>;

/// One clamped quantity with change and threshold notifications.
pub struct BoundedStat {
    current: f32,
    min: f32,
    max: f32,
    threshold: f32,
    decay_rate: f32,
    state: StatState,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
}

impl BoundedStat {
    /// Creates a stat.
    ///
    /// Fails with [`StatError::InvalidRange`] unless `min <= threshold <= max` and
    /// `min <= initial <= max`, or with [`StatError::InvalidArgument`] on non-finite input.
    pub fn new(min: f32, max: f32, initial: f32, threshold: f32) -> Result<Self, StatError> {
        if ![min, max, initial, threshold].iter().all(|v| v.is_finite()) {
            return Err(StatError::invalid("stat bounds must be finite"));
        }
        if min > max || threshold < min || threshold > max || initial < min || initial > max {
            return Err(StatError::InvalidRange {
                min,
                max,
                initial,
                threshold,
            });
        }
        let mut stat = Self {
            current: initial,
            min,
            max,
            threshold,
            decay_rate: 0.0,
            state: StatState::Normal,
            observers: Vec::new(),
            next_observer: 0,
        };
        stat.state = stat.classify(initial);
        Ok(stat)
    }

    /// Creates a stat starting at `max`.
    pub fn full(min: f32, max: f32, threshold: f32) -> Result<Self, StatError> {
        Self::new(min, max, max, threshold)
    }

    /// Sets the per-second decay used by [`tick_decay`](Self::tick_decay).
    pub fn with_decay_rate(mut self, per_second: f32) -> Result<Self, StatError> {
        if !per_second.is_finite() || per_second < 0.0 {
            return Err(StatError::invalid(format!(
                "decay rate must be finite and >= 0, got {per_second}"
            )));
        }
        self.decay_rate = per_second;
        Ok(self)
    }

    /// Current value.
    #[inline]
    pub fn value(&self) -> f32 {
        self.current
    }

    /// Lower bound.
    #[inline]
    pub fn min(&self) -> f32 {
        self.min
    }

    /// Upper bound.
    #[inline]
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Critical threshold.
    #[inline]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Stored decay per second (0 for event-only stats).
    #[inline]
    pub fn decay_rate(&self) -> f32 {
        self.decay_rate
    }

    /// Current value as a fraction of the range (1.0 for an empty range).
    pub fn ratio(&self) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            1.0
        } else {
            (self.current - self.min) / span
        }
    }

    /// Derived state.
    #[inline]
    pub fn state(&self) -> StatState {
        self.state
    }

    /// `current <= threshold`.
    #[inline]
    pub fn is_critical(&self) -> bool {
        self.state != StatState::Normal
    }

    /// `current <= min`.
    #[inline]
    pub fn is_depleted(&self) -> bool {
        self.state == StatState::Depleted
    }

    /// Adds `amount` (positive or negative) and clamps.
    pub fn apply_delta(&mut self, amount: f32) -> StatChange {
        if !amount.is_finite() {
            warn!(amount, "ignoring non-finite stat delta");
            return StatChange::unchanged(self.current, self.state);
        }
        self.assign(self.current + amount)
    }

    /// Sets the value absolutely (load/restore flows) and clamps.
    pub fn set_value(&mut self, value: f32) -> StatChange {
        if !value.is_finite() {
            warn!(value, "ignoring non-finite stat value");
            return StatChange::unchanged(self.current, self.state);
        }
        self.assign(value)
    }

    /// Applies `-rate * dt` for a continuously decaying stat.
    ///
    /// `dt` is elapsed seconds; both inputs must be finite and non-negative. A product
    /// too large for `f32` saturates, so the stat still ends up at `min`.
    pub fn tick(&mut self, dt: f32, rate: f32) -> Result<StatChange, StatError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(StatError::invalid(format!(
                "tick delta must be finite and >= 0, got {dt}"
            )));
        }
        if !rate.is_finite() || rate < 0.0 {
            return Err(StatError::invalid(format!(
                "decay rate must be finite and >= 0, got {rate}"
            )));
        }
        Ok(self.apply_delta((-rate * dt).max(f32::MIN)))
    }

    /// [`tick`](Self::tick) with the stored decay rate.
    pub fn tick_decay(&mut self, dt: f32) -> Result<StatChange, StatError> {
        self.tick(dt, self.decay_rate)
    }

    /// Registers an observer for every [`StatEvent`].
    pub fn observe<F>(&mut self, f: F) -> ObserverId
    where
        F: FnMut(&StatEvent) + Send + 'static,
    {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(f)));
        id
    }

    /// Removes an observer; false if unknown.
    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    /// Observes value changes only: `f(new_value)`.
    pub fn on_value_changed<F>(&mut self, mut f: F) -> ObserverId
    where
        F: FnMut(f32) + Send + 'static,
    {
        self.observe(move |ev| {
            if let StatEvent::ValueChanged { current, .. } = ev {
                f(*current);
            }
        })
    }

    /// Observes entering the critical state.
    pub fn on_critical_entered<F>(&mut self, mut f: F) -> ObserverId
    where
        F: FnMut() + Send + 'static,
    {
        self.observe(move |ev| {
            if matches!(ev, StatEvent::CriticalEntered { .. }) {
                f();
            }
        })
    }

    /// Observes leaving the critical state.
    pub fn on_critical_exited<F>(&mut self, mut f: F) -> ObserverId
    where
        F: FnMut() + Send + 'static,
    {
        self.observe(move |ev| {
            if matches!(ev, StatEvent::CriticalExited { .. }) {
                f();
            }
        })
    }

    /// Observes reaching `min`.
    pub fn on_depleted<F>(&mut self, mut f: F) -> ObserverId
    where
        F: FnMut() + Send + 'static,
    {
        self.observe(move |ev| {
            if matches!(ev, StatEvent::Depleted) {
                f();
            }
        })
    }

    fn classify(&self, value: f32) -> StatState {
        if value <= self.min {
            StatState::Depleted
        } else if value <= self.threshold {
            StatState::Critical
        } else {
            StatState::Normal
        }
    }

    fn assign(&mut self, raw: f32) -> StatChange {
        let next = raw.clamp(self.min, self.max);
        let change = StatChange {
            previous: self.current,
            current: next,
            from: self.state,
            to: self.classify(next),
        };
        self.current = next;
        self.state = change.to;
        self.notify(&change);
        change
    }

    fn notify(&mut self, change: &StatChange) {
        if self.observers.is_empty() {
            return;
        }
        for ev in change.events() {
            for (id, observer) in self.observers.iter_mut() {
                if panic::catch_unwind(AssertUnwindSafe(|| observer(&ev))).is_err() {
                    warn!(observer = id.0, event = ?ev, "stat observer panicked");
                }
            }
        }
    }
}

impl fmt::Debug for BoundedStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedStat")
            .field("current", &self.current)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("threshold", &self.threshold)
            .field("decay_rate", &self.decay_rate)
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recorded(stat: &mut BoundedStat) -> Arc<Mutex<Vec<StatEvent>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        stat.observe(move |ev| sink.lock().unwrap().push(*ev));
        log
    }

    fn count(log: &Arc<Mutex<Vec<StatEvent>>>, pred: fn(&StatEvent) -> bool) -> usize {
        log.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    #[test]
    fn test_construction_validates_ranges() {
        assert!(matches!(
            BoundedStat::new(10.0, 0.0, 5.0, 5.0),
            Err(StatError::InvalidRange { .. })
        ));
        assert!(matches!(
            BoundedStat::new(0.0, 100.0, 50.0, 101.0),
            Err(StatError::InvalidRange { .. })
        ));
        assert!(matches!(
            BoundedStat::new(0.0, 100.0, -1.0, 20.0),
            Err(StatError::InvalidRange { .. })
        ));
        assert!(matches!(
            BoundedStat::new(0.0, f32::NAN, 0.0, 0.0),
            Err(StatError::InvalidArgument { .. })
        ));
        assert!(BoundedStat::new(5.0, 5.0, 5.0, 5.0).is_ok());
    }

    #[test]
    fn test_initial_state_follows_initial_value() {
        assert_eq!(BoundedStat::full(0.0, 100.0, 20.0).unwrap().state(), StatState::Normal);
        assert_eq!(
            BoundedStat::new(0.0, 100.0, 10.0, 20.0).unwrap().state(),
            StatState::Critical
        );
        assert_eq!(
            BoundedStat::new(0.0, 100.0, 0.0, 20.0).unwrap().state(),
            StatState::Depleted
        );
    }

    #[test]
    fn test_apply_delta_clamps() {
        let mut stat = BoundedStat::full(0.0, 100.0, 20.0).unwrap();
        stat.apply_delta(-150.0);
        assert_eq!(stat.value(), 0.0);
        stat.apply_delta(500.0);
        assert_eq!(stat.value(), 100.0);

        for amount in [-1e9_f32, -33.3, -0.5, 0.0, 0.25, 17.0, 1e9] {
            stat.apply_delta(amount);
            assert!(
                (stat.min()..=stat.max()).contains(&stat.value()),
                "value {} escaped after delta {amount}",
                stat.value()
            );
        }
    }

    #[test]
    fn test_critical_notifications_are_edge_triggered() {
        let mut stat = BoundedStat::full(0.0, 100.0, 20.0).unwrap();
        let log = recorded(&mut stat);
        let entered = |e: &StatEvent| matches!(e, StatEvent::CriticalEntered { .. });
        let exited = |e: &StatEvent| matches!(e, StatEvent::CriticalExited { .. });

        stat.apply_delta(-85.0);
        assert_eq!(stat.value(), 15.0);
        assert_eq!(count(&log, entered), 1);

        stat.apply_delta(-1.0);
        assert_eq!(stat.value(), 14.0);
        assert_eq!(count(&log, entered), 1, "must not refire while critical");

        stat.apply_delta(10.0);
        assert_eq!(stat.value(), 24.0);
        assert_eq!(count(&log, exited), 1);
        assert_eq!(count(&log, entered), 1);
    }

    #[test]
    fn test_depleted_fires_once() {
        let mut stat = BoundedStat::new(0.0, 100.0, 10.0, 5.0).unwrap();
        let log = recorded(&mut stat);
        let depleted = |e: &StatEvent| matches!(e, StatEvent::Depleted);

        stat.apply_delta(-10.0);
        assert_eq!(stat.value(), 0.0);
        assert_eq!(count(&log, depleted), 1);

        stat.apply_delta(-5.0);
        assert_eq!(stat.value(), 0.0);
        assert_eq!(count(&log, depleted), 1);
        assert!(stat.is_depleted());
    }

    #[test]
    fn test_unchanged_value_notifies_nothing() {
        let mut stat = BoundedStat::full(0.0, 100.0, 20.0).unwrap();
        let log = recorded(&mut stat);
        let change = stat.apply_delta(25.0);
        assert!(!change.changed());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_direct_jumps_fire_every_edge_in_order() {
        let mut stat = BoundedStat::full(0.0, 100.0, 20.0).unwrap();
        let log = recorded(&mut stat);

        stat.set_value(0.0);
        stat.set_value(100.0);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                StatEvent::ValueChanged {
                    previous: 100.0,
                    current: 0.0
                },
                StatEvent::CriticalEntered { value: 0.0 },
                StatEvent::Depleted,
                StatEvent::ValueChanged {
                    previous: 0.0,
                    current: 100.0
                },
                StatEvent::Replenished { value: 100.0 },
                StatEvent::CriticalExited { value: 100.0 },
            ]
        );
    }

    #[test]
    fn test_threshold_equal_to_min() {
        let mut stat = BoundedStat::full(0.0, 10.0, 0.0).unwrap();
        let change = stat.apply_delta(-10.0);
        assert!(change.entered_critical());
        assert!(change.depleted());
        let change = stat.apply_delta(1.0);
        assert!(change.exited_critical());
        assert!(change.replenished());
    }

    #[test]
    fn test_non_finite_input_is_ignored() {
        let mut stat = BoundedStat::full(0.0, 100.0, 20.0).unwrap();
        let log = recorded(&mut stat);
        assert!(!stat.apply_delta(f32::NAN).changed());
        assert!(!stat.set_value(f32::INFINITY).changed());
        assert_eq!(stat.value(), 100.0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_tick_decays_and_validates() {
        let mut hunger = BoundedStat::full(0.0, 100.0, 20.0)
            .unwrap()
            .with_decay_rate(2.0)
            .unwrap();
        hunger.tick_decay(2.5).unwrap();
        assert_eq!(hunger.value(), 95.0);

        hunger.tick(1.0, 10.0).unwrap();
        assert_eq!(hunger.value(), 85.0);

        assert!(hunger.tick(-1.0, 1.0).is_err());
        assert!(hunger.tick(1.0, f32::NAN).is_err());
        assert!(BoundedStat::full(0.0, 1.0, 0.0)
            .unwrap()
            .with_decay_rate(-1.0)
            .is_err());
    }

    #[test]
    fn test_tick_overflow_depletes() {
        let mut stat = BoundedStat::full(0.0, 100.0, 20.0).unwrap();
        let log = recorded(&mut stat);

        let change = stat.tick(f32::MAX, 2.0).unwrap();

        assert!(change.changed());
        assert!(change.depleted());
        assert_eq!(stat.value(), 0.0);
        assert!(log.lock().unwrap().contains(&StatEvent::Depleted));
    }

    #[test]
    fn test_filtered_observers_and_unobserve() {
        let mut stat = BoundedStat::full(0.0, 100.0, 20.0).unwrap();
        let values = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&values);
        let id = stat.on_value_changed(move |v| sink.lock().unwrap().push(v));
        let crit = Arc::new(Mutex::new(0));
        let crit_sink = Arc::clone(&crit);
        stat.on_critical_entered(move || *crit_sink.lock().unwrap() += 1);

        stat.apply_delta(-90.0);
        assert!(stat.unobserve(id));
        assert!(!stat.unobserve(id));
        stat.apply_delta(5.0);

        assert_eq!(*values.lock().unwrap(), vec![10.0]);
        assert_eq!(*crit.lock().unwrap(), 1);
    }

    #[test]
    fn test_panicking_observer_is_contained() {
        let mut stat = BoundedStat::full(0.0, 100.0, 20.0).unwrap();
        stat.observe(|_ev| panic!("observer broke"));
        let log = recorded(&mut stat);

        let change = stat.apply_delta(-90.0);

        assert_eq!(stat.value(), 10.0);
        assert!(change.entered_critical());
        assert_eq!(log.lock().unwrap().len(), 2);
    }
}
