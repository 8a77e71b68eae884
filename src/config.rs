//! # Event bus configuration.
//!
//! Provides [`BusConfig`], the settings an [`EventBus`](crate::EventBus) is built with.
//!
//! ## Sentinel values
//! - `report_failures = false` → failures are only logged and counted; nothing is
//!   published on the diagnostics channel.

use std::borrow::Cow;

/// Default diagnostics channel, carrying [`ListenerFailure`](crate::ListenerFailure) payloads.
pub const LISTENER_FAILED_CHANNEL: &str = "bus.listener_failed";

/// Configuration for the event bus.
///
/// ## Field semantics
/// - `report_failures`: publish each contained listener failure on `failure_channel`
/// - `failure_channel`: name of the diagnostics channel (bound to `ListenerFailure`)
///
/// ## Notes
/// All fields are public. Prefer [`BusConfig::failure_channel_name`] over
/// checking `report_failures` by hand.
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// Publish contained listener failures on the diagnostics channel.
    ///
    /// Failures raised by listeners of the diagnostics channel itself are only
    /// logged, never republished.
    pub report_failures: bool,

    /// Name of the diagnostics channel.
    pub failure_channel: Cow<'static, str>,
}

impl BusConfig {
    /// Returns the diagnostics channel name, or `None` when reporting is disabled
    /// or the configured name is blank.
    #[inline]
    pub fn failure_channel_name(&self) -> Option<&str> {
        if !self.report_failures || self.failure_channel.trim().is_empty() {
            None
        } else {
            Some(&self.failure_channel)
        }
    }
}

impl Default for BusConfig {
    /// Default configuration:
    ///
    /// - `report_failures = true`
    /// - `failure_channel = "bus.listener_failed"`
    fn default() -> Self {
        Self {
            report_failures: true,
            failure_channel: Cow::Borrowed(LISTENER_FAILED_CHANNEL),
        }
    }
}
