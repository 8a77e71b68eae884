//! Serializable stat snapshots for host-side save/load.
//!
//! The core never touches storage; hosts serialize these with whatever format they
//! use (JSON in the tests).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Values of every stat in one [`StatRegistry`](crate::StatRegistry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Owning entity at capture time.
    pub entity: String,
    /// Stat name to value.
    pub values: BTreeMap<String, f32>,
}

impl RegistrySnapshot {
    /// Value captured for `name`, if any.
    pub fn get(&self, name: &str) -> Option<f32> {
        self.values.get(name).copied()
    }
}
