//! Channel table entries and channel-name validation.

use std::any::{TypeId, type_name};
use std::sync::Arc;

use crate::error::BusError;

use super::handle::Subscriber;

/// Rejects empty or whitespace-only channel names.
pub(crate) fn validate_name(name: &str) -> Result<(), BusError> {
    if name.trim().is_empty() {
        return Err(BusError::InvalidArgument {
            reason: "channel name must not be empty",
        });
    }
    Ok(())
}

/// One named channel: its payload type binding and ordered subscribers.
pub(crate) struct Channel {
    pub(crate) name: Arc<str>,
    payload: TypeId,
    payload_name: &'static str,
    /// Subscription order == invocation order.
    pub(crate) subscribers: Vec<Arc<Subscriber>>,
}

impl Channel {
    pub(crate) fn bound_to<T: 'static>(name: Arc<str>) -> Self {
        Self {
            name,
            payload: TypeId::of::<T>(),
            payload_name: type_name::<T>(),
            subscribers: Vec::new(),
        }
    }

    /// Fails with `TypeMismatch` unless the channel carries `T`.
    pub(crate) fn check<T: 'static>(&self) -> Result<(), BusError> {
        if self.payload == TypeId::of::<T>() {
            Ok(())
        } else {
            Err(BusError::TypeMismatch {
                channel: self.name.to_string(),
                expected: self.payload_name,
                found: type_name::<T>(),
            })
        }
    }

    /// Removes the subscription with `id`; returns whether it was present.
    pub(crate) fn remove(&mut self, id: u64) -> bool {
        match self.subscribers.iter().position(|s| s.id == id) {
            Some(idx) => {
                let sub = self.subscribers.remove(idx);
                sub.invalidate();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_names_rejected() {
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("PlayerDied").is_ok());
    }

    #[test]
    fn test_type_binding() {
        let ch = Channel::bound_to::<u32>(Arc::from("score"));
        assert!(ch.check::<u32>().is_ok());
        match ch.check::<String>() {
            Err(BusError::TypeMismatch { expected, found, .. }) => {
                assert_eq!(expected, "u32");
                assert_eq!(found, type_name::<String>());
            }
            other => panic!("expected type mismatch, got {other:?}"),
        }
    }
}
