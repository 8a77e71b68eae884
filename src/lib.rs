//! # gamebus
//!
//! **gamebus** is an engine-agnostic event bus and stat toolkit for game logic.
//!
//! It provides a typed, named-channel publish/subscribe bus with synchronous FIFO
//! delivery and per-listener fault isolation, plus clamped "bounded stats" (health,
//! hunger, thirst, stamina...) that notify only on the edges of their critical state.
//! The crate owns no game loop and no global state; hosts construct and pass handles.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ BoundedStat  │   │ BoundedStat  │   │ BoundedStat  │
//!     │   (hunger)   │   │   (thirst)   │   │   (health)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ CriticalEntered / CriticalExited    │ (excluded from aggregate)
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  StatRegistry (one entity)                                        │
//! │  - named stats, snapshot / restore                                │
//! │  - DangerTracker: set of critical non-health stats                │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   │ edge of "any critical"
//!                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                 EventBus (named, type-bound channels)             │
//! │  "EntityCriticalStateChanged"  "EntityDied"  "bus.listener_failed"│
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     listener 1         listener 2         listener N     (FIFO, synchronous)
//! ```
//!
//! ### Publish
//! ```text
//! publish(channel, payload)
//!   ├─► bind/check channel type      ─► Err(TypeMismatch)
//!   ├─► wrap into Event { seq, at, channel, payload }
//!   ├─► snapshot subscribers (lock released)
//!   └─► for each live subscriber, in subscription order:
//!         ├─ Ok            ─► delivered += 1
//!         └─ Err / panic   ─► failed += 1, warn!, publish ListenerFailure
//!                             on "bus.listener_failed" (never recursively)
//! ```
//!
//! ## Features
//! | Area          | Description                                                  | Key types / traits                              |
//! |---------------|--------------------------------------------------------------|-------------------------------------------------|
//! | **Bus**       | Named channels, typed payloads, FIFO delivery, RAII guards.  | [`EventBus`], [`Event`], [`Subscription`]       |
//! | **Listeners** | Closures or named listener types.                            | [`Listener`]                                    |
//! | **Stats**     | Clamped values with edge-triggered notifications.            | [`BoundedStat`], [`StatEvent`], [`StatChange`]  |
//! | **Registry**  | Per-entity stats and the aggregate danger event.             | [`StatRegistry`], [`EntityCriticalStateChanged`]|
//! | **Survival**  | Reference hunger/thirst/health coupling.                     | [`SurvivalSystem`], [`SurvivalRules`]           |
//! | **Errors**    | Typed errors for bus and stat operations.                    | [`BusError`], [`StatError`]                     |
//! | **Config**    | Bus failure reporting.                                       | [`BusConfig`]                                   |
//!
//! ## Optional features
//! - `driver` _(default)_: [`TickDriver`], a tokio interval loop for hosts without a frame loop.
//! - `logging`: exports a simple built-in [`LogWriter`] listener _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use gamebus::{
//!     EntityCriticalStateChanged, Event, EventBus, SurvivalSystem,
//!     ENTITY_CRITICAL_STATE_CHANGED,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = EventBus::new();
//!
//!     let alerts = Arc::new(Mutex::new(Vec::new()));
//!     let sink = Arc::clone(&alerts);
//!     bus.subscribe(
//!         ENTITY_CRITICAL_STATE_CHANGED,
//!         move |ev: &Event<EntityCriticalStateChanged>| {
//!             sink.lock().unwrap().push(ev.payload.critical);
//!         },
//!     )?;
//!
//!     let survival = SurvivalSystem::default();
//!     let mut player = survival.standard_registry("player", bus.clone())?;
//!
//!     player.apply_delta("hunger", -90.0)?; // 10 <= threshold 20
//!     player.apply_delta("hunger", 50.0)?;
//!
//!     assert_eq!(*alerts.lock().unwrap(), vec![true, false]);
//!     Ok(())
//! }
//! ```
mod config;
mod error;
mod events;
mod listeners;
mod stats;
mod survival;

// ---- Public re-exports ----

pub use config::{BusConfig, LISTENER_FAILED_CHANNEL};
pub use error::{BusError, FailureKind, ListenerError, ListenerFailure, StatError};
pub use events::{BusStats, Event, EventBus, SubscriberHandle, Subscription};
pub use listeners::Listener;
pub use stats::{
    BoundedStat, ENTITY_CRITICAL_STATE_CHANGED, EntityCriticalStateChanged, ObserverId,
    PendingEvents, RegistrySnapshot, StatChange, StatEvent, StatRegistry, StatState,
};
pub use survival::{DeathCause, ENTITY_DIED, EntityDied, SurvivalRules, SurvivalSystem};

// Optional: periodic tick loop on tokio.
// Enable with: `--features driver` (on by default)
#[cfg(feature = "driver")]
mod driver;
#[cfg(feature = "driver")]
pub use driver::TickDriver;

// Optional: expose a simple built-in logger listener (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use listeners::LogWriter;
