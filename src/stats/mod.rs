//! Observable bounded stats and their per-entity registry.
//!
//! ## Contents
//! - [`BoundedStat`] clamped value with edge-triggered critical/depleted notifications
//! - [`StatRegistry`] named stats of one entity, aggregating their critical transitions
//!   into one bus event
//! - [`RegistrySnapshot`] serde-friendly values for host-side persistence
//!
//! ## Quick wiring
//! ```text
//! StatRegistry::new(entity, "health", bus)
//!      ├─► add_stat("hunger", BoundedStat) ── observer ──► DangerTracker
//!      └─► apply_delta / set_value / tick_all
//!                 └─► StatEvent::* ──► user observers
//!                               └────► EntityCriticalStateChanged on the bus (edges only)
//! ```

mod bounded;
mod registry;
mod snapshot;

pub use bounded::{BoundedStat, ObserverId, StatChange, StatEvent, StatState};
pub use registry::{
    ENTITY_CRITICAL_STATE_CHANGED, EntityCriticalStateChanged, PendingEvents, StatRegistry,
};
pub use snapshot::RegistrySnapshot;
