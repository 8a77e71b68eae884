//! # LogWriter: simple event logger
//!
//! A minimal listener that writes every [`Event`] it receives as a `tracing` record.
//! Use it for tests or demos; subscribe one instance per channel you want traced.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO gamebus::listeners::log: event channel=ItemCollected seq=4 payload=ItemCollected { item: "coin", value: 5 }
//! INFO gamebus::listeners::log: event channel=bus.listener_failed seq=5 payload=ListenerFailure { .. }
//! ```

use std::fmt::Debug;

use crate::error::ListenerError;
use crate::events::Event;
use crate::listeners::Listener;

/// Event writer listener.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<T> Listener<T> for LogWriter
where
    T: Debug + Send + Sync + 'static,
{
    fn on_event(&self, e: &Event<T>) -> Result<(), ListenerError> {
        tracing::info!(channel = %e.channel, seq = e.seq, payload = ?e.payload, "event");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
