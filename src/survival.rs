//! # Survival rules: host-level composition of stats.
//!
//! Builds the classic health/hunger/thirst/stamina set on a [`StatRegistry`] and
//! couples them: while hunger or thirst is critical, health takes continuous damage.
//! None of this lives in [`BoundedStat`] itself; games with different rules write
//! their own version of [`SurvivalSystem::update`].
//!
//! ## Per update
//! ```text
//! update(registry, dt)
//!   ├─► health depleted?           ─► nothing (already dead)
//!   ├─► registry.tick_all(dt)       (hunger / thirst decay)
//!   ├─► damage = starvation_damage * dt   if hunger critical
//!   │          + dehydration_damage * dt  if thirst critical
//!   ├─► health.apply_delta(-damage)
//!   └─► health depletion edge      ─► publish EntityDied { entity, cause } on "EntityDied"
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StatError;
use crate::events::EventBus;
use crate::stats::{BoundedStat, StatRegistry};

/// Channel carrying [`EntityDied`] payloads.
pub const ENTITY_DIED: &str = "EntityDied";

/// What killed the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    /// Health ran out while hunger was critical.
    Starvation,
    /// Health ran out while only thirst was critical.
    Dehydration,
}

/// Published once when an entity's health is depleted by [`SurvivalSystem::update`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDied {
    /// Owning entity.
    pub entity: String,
    /// Dominant damage source on the killing update.
    pub cause: DeathCause,
}

/// Tunables for [`SurvivalSystem`].
///
/// All rates are per second. A decay rate of `0.0` means the stat only changes
/// through explicit host calls (health and stamina by default).
#[derive(Clone, Debug)]
pub struct SurvivalRules {
    /// Name of the health stat (excluded from the danger aggregate).
    pub health: Cow<'static, str>,
    /// Name of the hunger stat.
    pub hunger: Cow<'static, str>,
    /// Name of the thirst stat.
    pub thirst: Cow<'static, str>,
    /// Name of the stamina stat.
    pub stamina: Cow<'static, str>,
    /// Upper bound of every stat (lower bound is `0`).
    pub max: f32,
    /// Critical threshold as a fraction of `max`.
    pub critical_ratio: f32,
    /// Passive hunger loss.
    pub hunger_decay: f32,
    /// Passive thirst loss.
    pub thirst_decay: f32,
    /// Health damage while hunger is critical.
    pub starvation_damage: f32,
    /// Health damage while thirst is critical.
    pub dehydration_damage: f32,
}

impl Default for SurvivalRules {
    /// Returns rules with:
    /// - stats `health`, `hunger`, `thirst`, `stamina` in `[0, 100]`
    /// - `critical_ratio = 0.2` (threshold `20`)
    /// - `hunger_decay = 0.2`, `thirst_decay = 0.3`
    /// - `starvation_damage = 0.5`, `dehydration_damage = 0.1`
    fn default() -> Self {
        Self {
            health: Cow::Borrowed("health"),
            hunger: Cow::Borrowed("hunger"),
            thirst: Cow::Borrowed("thirst"),
            stamina: Cow::Borrowed("stamina"),
            max: 100.0,
            critical_ratio: 0.2,
            hunger_decay: 0.2,
            thirst_decay: 0.3,
            starvation_damage: 0.5,
            dehydration_damage: 0.1,
        }
    }
}

impl SurvivalRules {
    fn threshold(&self) -> f32 {
        self.max * self.critical_ratio.clamp(0.0, 1.0)
    }
}

/// Applies [`SurvivalRules`] to registries.
#[derive(Clone, Debug, Default)]
pub struct SurvivalSystem {
    rules: SurvivalRules,
}

impl SurvivalSystem {
    /// Creates a system with the given rules.
    pub fn new(rules: SurvivalRules) -> Self {
        Self { rules }
    }

    /// Active rules.
    pub fn rules(&self) -> &SurvivalRules {
        &self.rules
    }

    /// Builds a registry holding full health, hunger, thirst and stamina stats.
    pub fn standard_registry(
        &self,
        entity: impl Into<Arc<str>>,
        bus: EventBus,
    ) -> Result<StatRegistry, StatError> {
        let r = &self.rules;
        let threshold = r.threshold();

        let mut registry = StatRegistry::new(entity, r.health.as_ref(), bus);
        registry.add_stat(r.health.as_ref(), BoundedStat::full(0.0, r.max, threshold)?)?;
        registry.add_stat(
            r.hunger.as_ref(),
            BoundedStat::full(0.0, r.max, threshold)?.with_decay_rate(r.hunger_decay)?,
        )?;
        registry.add_stat(
            r.thirst.as_ref(),
            BoundedStat::full(0.0, r.max, threshold)?.with_decay_rate(r.thirst_decay)?,
        )?;
        registry.add_stat(r.stamina.as_ref(), BoundedStat::full(0.0, r.max, threshold)?)?;
        Ok(registry)
    }

    /// Advances `registry` by `dt` seconds.
    ///
    /// Returns the cause if this update killed the entity. Dead entities (health
    /// already depleted) are left untouched.
    pub fn update(
        &self,
        registry: &mut StatRegistry,
        dt: f32,
    ) -> Result<Option<DeathCause>, StatError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(StatError::invalid(format!(
                "dt must be finite and >= 0, got {dt}"
            )));
        }
        let r = &self.rules;
        if registry.get_stat(&r.health)?.is_depleted() {
            return Ok(None);
        }

        registry.tick_all(dt)?;

        let starving = is_critical(registry, &r.hunger)?;
        let parched = is_critical(registry, &r.thirst)?;
        let mut damage = 0.0;
        if starving {
            damage += r.starvation_damage * dt;
        }
        if parched {
            damage += r.dehydration_damage * dt;
        }
        if damage <= 0.0 {
            return Ok(None);
        }

        let change = registry.apply_delta(&r.health, -damage)?;
        if !change.depleted() {
            return Ok(None);
        }

        let cause = if starving {
            DeathCause::Starvation
        } else {
            DeathCause::Dehydration
        };
        info!(entity = registry.entity(), ?cause, "entity died");
        registry.emit(
            ENTITY_DIED,
            EntityDied {
                entity: registry.entity().to_string(),
                cause,
            },
        );
        Ok(Some(cause))
    }

    /// Runs [`update`](Self::update) on a shared registry at the driver's cadence.
    ///
    /// Each tick runs the update in deferred mode under the registry lock, then
    /// publishes the queued events after the lock is released, so listeners may lock
    /// the registry themselves. Update errors are logged and the loop keeps going.
    #[cfg(feature = "driver")]
    pub fn spawn(
        &self,
        registry: Arc<std::sync::Mutex<StatRegistry>>,
        driver: crate::driver::TickDriver,
        token: tokio_util::sync::CancellationToken,
    ) -> tokio::task::JoinHandle<u64> {
        let system = self.clone();
        driver.spawn(token, move |elapsed| {
            let pending = {
                let mut reg = registry
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                let was_deferred = reg.is_deferred();
                reg.set_deferred(true);
                if let Err(err) = system.update(&mut reg, elapsed.as_secs_f32()) {
                    tracing::warn!(
                        entity = reg.entity(),
                        error = %err,
                        label = err.as_label(),
                        "survival update failed"
                    );
                }
                reg.set_deferred(was_deferred);
                reg.take_pending()
            };
            pending.publish();
        })
    }
}

/// Missing stats count as "not critical" so hosts may drop hunger or thirst.
fn is_critical(registry: &StatRegistry, name: &str) -> Result<bool, StatError> {
    match registry.get_stat(name) {
        Ok(stat) => Ok(stat.is_critical()),
        Err(StatError::NotFound { .. }) => Ok(false),
        Err(err) => Err(err),
    }
}
