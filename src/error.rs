//! Error types used by the event bus and the stat primitives.
//!
//! This module defines two main error enums and one failure record:
//!
//! - [`BusError`]: call-site errors raised by [`EventBus`](crate::EventBus) operations.
//! - [`StatError`]: errors raised by stat construction, ticking and registry lookups.
//! - [`ListenerFailure`]: a contained listener failure; never returned from `publish`.
//!
//! All of them provide `as_label` (stable snake_case label for logs/metrics) and
//! `as_message` helpers.

use std::sync::Arc;

use thiserror::Error;

/// Error type returned by fallible listeners.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced by the event bus.
///
/// These are surfaced synchronously to the caller. Listener failures are **not**
/// part of this enum: they are contained inside `publish` (see [`ListenerFailure`]).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Malformed call-site argument (e.g. empty channel name).
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the argument.
        reason: &'static str,
    },

    /// Payload type does not match the type the channel is bound to.
    #[error("channel '{channel}' carries {expected}, got {found}")]
    TypeMismatch {
        /// Channel name.
        channel: String,
        /// Payload type the channel was bound to on first use.
        expected: &'static str,
        /// Payload type supplied by the caller.
        found: &'static str,
    },

    /// The bus has been shut down and no longer accepts subscriptions.
    #[error("event bus is shut down")]
    Closed,
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use gamebus::BusError;
    ///
    /// let err = BusError::InvalidArgument { reason: "empty channel name" };
    /// assert_eq!(err.as_label(), "bus_invalid_argument");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::InvalidArgument { .. } => "bus_invalid_argument",
            BusError::TypeMismatch { .. } => "bus_type_mismatch",
            BusError::Closed => "bus_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BusError::InvalidArgument { reason } => format!("invalid argument: {reason}"),
            BusError::TypeMismatch {
                channel,
                expected,
                found,
            } => format!("type mismatch on {channel:?}: expected={expected} found={found}"),
            BusError::Closed => "bus closed".to_string(),
        }
    }
}

/// # Errors produced by stats and stat registries.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatError {
    /// Malformed argument (empty name, negative or non-finite tick input).
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the argument.
        reason: String,
    },

    /// Construction parameters violate `min <= threshold <= max` or `min <= initial <= max`.
    #[error("invalid range: min={min} max={max} initial={initial} threshold={threshold}")]
    InvalidRange {
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
        /// Requested initial value.
        initial: f32,
        /// Requested critical threshold.
        threshold: f32,
    },

    /// No stat registered under this name.
    #[error("stat '{name}' not found")]
    NotFound {
        /// Requested stat name.
        name: String,
    },

    /// A stat with this name is already registered.
    #[error("stat '{name}' already registered")]
    DuplicateStat {
        /// Conflicting stat name.
        name: String,
    },
}

impl StatError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use gamebus::StatError;
    ///
    /// let err = StatError::NotFound { name: "mana".into() };
    /// assert_eq!(err.as_label(), "stat_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StatError::InvalidArgument { .. } => "stat_invalid_argument",
            StatError::InvalidRange { .. } => "stat_invalid_range",
            StatError::NotFound { .. } => "stat_not_found",
            StatError::DuplicateStat { .. } => "stat_duplicate",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            StatError::InvalidArgument { reason } => format!("invalid argument: {reason}"),
            StatError::InvalidRange {
                min,
                max,
                initial,
                threshold,
            } => format!("range [{min}, {max}] rejects initial={initial} threshold={threshold}"),
            StatError::NotFound { name } => format!("unknown stat {name:?}"),
            StatError::DuplicateStat { name } => format!("duplicate stat {name:?}"),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        StatError::InvalidArgument {
            reason: reason.into(),
        }
    }
}

/// How a listener failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The listener returned an error.
    Error,
    /// The listener panicked.
    Panic,
}

impl FailureKind {
    /// Returns a short stable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Error => "error",
            FailureKind::Panic => "panic",
        }
    }
}

/// # A listener failure contained inside `publish`.
///
/// Recorded (logged, counted, optionally republished on the diagnostics channel)
/// and never propagated to the publisher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("listener '{listener}' on channel '{channel}' failed ({}): {reason}", .kind.as_str())]
pub struct ListenerFailure {
    /// Channel the failing listener was subscribed to.
    pub channel: Arc<str>,
    /// Listener name (type name for closures unless named explicitly).
    pub listener: Arc<str>,
    /// Id of the failing subscription.
    pub subscriber_id: u64,
    /// Sequence number of the event that was being delivered.
    pub seq: u64,
    /// Returned error or panic.
    pub kind: FailureKind,
    /// Error message or panic payload.
    pub reason: String,
}

impl ListenerFailure {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self.kind {
            FailureKind::Error => "listener_error",
            FailureKind::Panic => "listener_panic",
        }
    }
}
