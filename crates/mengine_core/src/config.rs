//! # World Configuration
//!
//! Storage tuning for a world. Loaded once at startup, either from code or
//! from a TOML file:
//!
//! ```toml
//! initial_capacity = 1024
//! compaction_ratio = 0.5
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, EcsResult};

/// Default number of slots allocated per component store.
pub const DEFAULT_INITIAL_CAPACITY: usize = 512;

/// Default fraction of dead slots (relative to capacity) that triggers compaction.
pub const DEFAULT_COMPACTION_RATIO: f64 = 0.5;

/// Configuration for a [`World`](crate::World).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Slots allocated when a component store is registered. Stores never
    /// compact while their capacity is at or below this floor.
    pub initial_capacity: usize,
    /// Compaction runs once dead slots exceed `capacity * compaction_ratio`.
    pub compaction_ratio: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            compaction_ratio: DEFAULT_COMPACTION_RATIO,
        }
    }
}

impl WorldConfig {
    /// Sets the initial store capacity.
    #[must_use]
    pub const fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Sets the compaction ratio.
    #[must_use]
    pub const fn with_compaction_ratio(mut self, ratio: f64) -> Self {
        self.compaction_ratio = ratio;
        self
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the capacity is zero or the
    /// ratio lies outside `(0, 1]`.
    pub fn validate(&self) -> EcsResult<()> {
        if self.initial_capacity == 0 {
            return Err(EcsError::InvalidConfig(
                "initial_capacity must be greater than zero".to_string(),
            ));
        }
        if !(self.compaction_ratio > 0.0 && self.compaction_ratio <= 1.0) {
            return Err(EcsError::InvalidConfig(format!(
                "compaction_ratio must be in (0, 1], got {}",
                self.compaction_ratio
            )));
        }
        Ok(())
    }

    /// Parses and validates a configuration from TOML text.
    ///
    /// Missing keys fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] on malformed TOML, unknown keys or
    /// values rejected by [`WorldConfig::validate`].
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the file cannot be read or its
    /// contents are invalid.
    pub fn from_toml_file(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            EcsError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }
}
