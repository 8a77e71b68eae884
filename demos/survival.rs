//! # Example: survival
//!
//! One player whose hunger and thirst decay on a [`TickDriver`], with every
//! interesting channel traced by [`LogWriter`].
//!
//! Demonstrates how to:
//! - Build a standard registry through [`SurvivalSystem`].
//! - React to `EntityCriticalStateChanged` and `EntityDied`.
//! - Watch contained listener failures on `bus.listener_failed`.
//!
//! ## Flow
//! ```text
//! TickDriver (100ms) ──► SurvivalSystem::update(registry, dt)
//!     ├─► hunger / thirst decay (accelerated rules)
//!     ├─► EntityCriticalStateChanged { critical: true }
//!     ├─► health damage while starving
//!     └─► EntityDied ──► save (locks the registry) ──► token.cancel()
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example survival --features logging
//! ```

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use gamebus::{
    ENTITY_CRITICAL_STATE_CHANGED, ENTITY_DIED, EntityCriticalStateChanged, EntityDied, Event,
    EventBus, LISTENER_FAILED_CHANNEL, ListenerFailure, LogWriter, SurvivalRules, SurvivalSystem,
    TickDriver,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bus = EventBus::new();
    let token = CancellationToken::new();

    let writer = Arc::new(LogWriter::new());
    bus.subscribe_listener::<EntityCriticalStateChanged, _>(
        ENTITY_CRITICAL_STATE_CHANGED,
        writer.clone(),
    )?;
    bus.subscribe_listener::<EntityDied, _>(ENTITY_DIED, writer.clone())?;
    bus.subscribe_listener::<ListenerFailure, _>(LISTENER_FAILED_CHANNEL, writer)?;

    // A buggy HUD: its failure is contained and reported, the rest keep running.
    bus.subscribe_fallible(
        ENTITY_CRITICAL_STATE_CHANGED,
        |_ev: &Event<EntityCriticalStateChanged>| Err("hud widget not mounted".into()),
    )?;

    let system = SurvivalSystem::new(SurvivalRules {
        hunger_decay: 20.0,
        thirst_decay: 5.0,
        starvation_damage: 40.0,
        ..SurvivalRules::default()
    });
    let player = Arc::new(Mutex::new(system.standard_registry("player-1", bus.clone())?));

    // Save-on-death reads the shared registry: the driver publishes only after it
    // released the registry lock, so locking here is fine.
    let stop = token.clone();
    let saved = Arc::clone(&player);
    bus.subscribe(ENTITY_DIED, move |ev: &Event<EntityDied>| {
        println!("[game] {} died of {:?}, stopping", ev.payload.entity, ev.payload.cause);
        if let Ok(reg) = saved.lock() {
            println!("[game] death save: {:?}", reg.snapshot().values);
        }
        stop.cancel();
    })?;

    let handle = system.spawn(
        Arc::clone(&player),
        TickDriver::new(Duration::from_millis(100)),
        token.clone(),
    );

    tokio::select! {
        _ = token.cancelled() => {}
        _ = tokio::time::sleep(Duration::from_secs(30)) => token.cancel(),
    }
    let ticks = handle.await?;

    let snapshot = player.lock().map_err(|_| "registry lock poisoned")?.snapshot();
    println!("[game] stopped after {ticks} ticks: {:?}", snapshot.values);
    println!("[game] bus stats: {:?}", bus.stats());
    Ok(())
}
