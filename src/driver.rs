//! # TickDriver: periodic update loop.
//!
//! Hosts without their own frame loop use this to call stat updates at a fixed
//! cadence. The callback receives the measured elapsed time since the previous tick,
//! so missed or delayed ticks show up as longer `dt` rather than extra calls.
//!
//! ## Architecture
//! ```text
//! TickDriver::spawn(token, on_tick) ──► tokio task
//!
//! loop {
//!   select! {
//!     token.cancelled()  ─► break
//!     interval.tick()    ─► on_tick(now - last); ticks += 1
//!   }
//! }
//! JoinHandle<u64> ◄── ticks
//! ```
//!
//! ## Rules
//! - The first tick happens one full period after spawn.
//! - Cancellation wins over a ready tick.
//! - The callback runs on the driver task; it must not block for long.

use std::time::Duration;

use tokio::{
    select,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Lower bound applied to the tick period.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Spawns a periodic callback on the current tokio runtime.
#[derive(Debug, Clone, Copy)]
pub struct TickDriver {
    period: Duration,
}

impl TickDriver {
    /// Creates a driver ticking every `period` (raised to 1ms if smaller).
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(MIN_PERIOD),
        }
    }

    /// Tick period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Runs `on_tick(elapsed)` every period until `token` is cancelled.
    ///
    /// The returned handle resolves to the number of completed ticks.
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(self, token: CancellationToken, mut on_tick: F) -> JoinHandle<u64>
    where
        F: FnMut(Duration) + Send + 'static,
    {
        tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + self.period, self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut last = Instant::now();
            let mut ticks: u64 = 0;
            loop {
                select! {
                    biased;
                    _ = token.cancelled() => break,
                    at = interval.tick() => {
                        on_tick(at.saturating_duration_since(last));
                        last = at;
                        ticks += 1;
                    }
                }
            }

            debug!(ticks, period_ms = self.period.as_millis() as u64, "tick driver stopped");
            ticks
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_cancelled() {
        let token = CancellationToken::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let handle = TickDriver::new(Duration::from_millis(100))
            .spawn(token.clone(), move |dt| sink.lock().unwrap().push(dt));

        time::sleep(Duration::from_millis(350)).await;
        token.cancel();
        let ticks = handle.await.unwrap();

        assert_eq!(ticks, 3);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(
            seen.iter().all(|dt| *dt == Duration::from_millis(100)),
            "unexpected intervals: {seen:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_tick() {
        let token = CancellationToken::new();
        token.cancel();

        let handle = TickDriver::new(Duration::from_secs(1)).spawn(token, |_| {
            panic!("must not tick");
        });

        assert_eq!(handle.await.unwrap(), 0);
    }

    #[test]
    fn test_zero_period_is_raised() {
        assert_eq!(TickDriver::new(Duration::ZERO).period(), MIN_PERIOD);
    }
}
