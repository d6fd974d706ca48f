//! # Storage Configuration
//!
//! Sizing and growth knobs for the containers and the entity registry,
//! loadable from TOML:
//!
//! ```toml
//! [hash_map]
//! initial_capacity = 256
//!
//! [ecs]
//! entity_capacity = 4096
//! id_seed = 42
//! ```
//!
//! Every field is optional and falls back to its default.

use serde::{Deserialize, Serialize};

use crate::collections::GrowthPolicy;
use crate::ecs::mask::MAX_COMPONENTS;
use crate::error::ConfigError;

/// Sizing of a [`World`](crate::ecs::World).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcsConfig {
    /// Initial number of entity slots.
    pub entity_capacity: usize,
    /// Initial slots of each component pool.
    pub component_capacity: usize,
    /// Initial component-handle slots per entity.
    pub handles_per_entity: usize,
    /// Maximum number of component types (at most 64).
    pub max_components: usize,
    /// Seed of the entity id generator. Equal seeds give equal id sequences.
    pub id_seed: u64,
    /// Capacity of each event subscriber channel.
    pub event_capacity: usize,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            entity_capacity: 1000,
            component_capacity: 1000,
            handles_per_entity: 8,
            max_components: MAX_COMPONENTS,
            id_seed: 0,
            event_capacity: 1024,
        }
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Growth policy of hash maps created by the storage layer.
    pub hash_map: GrowthPolicy,
    /// Entity registry sizing.
    pub ecs: EcsConfig,
}

impl StorageConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let policy = &self.hash_map;
        let ecs = &self.ecs;
        let non_zero = [
            ("hash_map.initial_capacity", policy.initial_capacity),
            ("hash_map.iter_count_div", policy.iter_count_div),
            ("hash_map.iter_collisions_div", policy.iter_collisions_div),
            ("hash_map.count_div", policy.count_div),
            ("hash_map.collisions_div", policy.collisions_div),
            ("ecs.entity_capacity", ecs.entity_capacity),
            ("ecs.component_capacity", ecs.component_capacity),
            ("ecs.handles_per_entity", ecs.handles_per_entity),
            ("ecs.event_capacity", ecs.event_capacity),
        ];
        if let Some((field, _)) = non_zero.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{field} must be non-zero")));
        }
        if !(1..=MAX_COMPONENTS).contains(&ecs.max_components) {
            return Err(ConfigError::Invalid(format!(
                "ecs.max_components must be in 1..={MAX_COMPONENTS}, got {}",
                ecs.max_components
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.hash_map.initial_capacity, 100);
        assert_eq!(config.hash_map.iter_capacity_threshold, 1000);
        assert_eq!(config.ecs.entity_capacity, 1000);
        assert_eq!(config.ecs.max_components, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document() {
        let config = StorageConfig::from_toml_str(
            r"
            [hash_map]
            initial_capacity = 256

            [ecs]
            id_seed = 42
            ",
        )
        .unwrap();

        assert_eq!(config.hash_map.initial_capacity, 256);
        assert_eq!(config.hash_map.count_div, 2);
        assert_eq!(config.ecs.id_seed, 42);
        assert_eq!(config.ecs.handles_per_entity, 8);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(StorageConfig::from_toml_str("").unwrap(), StorageConfig::default());
    }

    #[test]
    fn test_rejects_zero_divisor() {
        let err = StorageConfig::from_toml_str("[hash_map]\ncount_div = 0\n").unwrap_err();
        assert!(err.to_string().contains("hash_map.count_div"));
    }

    #[test]
    fn test_rejects_too_many_components() {
        let err = StorageConfig::from_toml_str("[ecs]\nmax_components = 65\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = StorageConfig::from_toml_str("[ecs\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
