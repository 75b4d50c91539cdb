//! Construction configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Knobs for building a store.
///
/// The defaults give a false-positive rate of about `2^-24` per absent
/// lookup and tables of roughly `2.09` rows per item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Length of the per-construction salt
    pub salt_bytes: usize,
    /// Trailing zero bytes checked on lookup
    pub tag_bytes: usize,
    /// Rows per item when sizing the table
    pub table_factor: f64,
    /// Salts tried before construction gives up
    pub max_attempts: usize,
    /// Threads racing independent attempts
    pub workers: usize,
    /// Append a marker byte so outputs of different lengths can share a table
    pub pad_enabled: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            salt_bytes: 8,
            tag_bytes: 3,
            table_factor: 2.09,
            max_attempts: 1000,
            workers: 1,
            pad_enabled: true,
        }
    }
}

impl StoreConfig {
    /// Config for tables whose outputs all have the same width
    pub fn unpadded() -> Self {
        Self {
            pad_enabled: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(8..=32).contains(&self.salt_bytes) {
            return Err(ConfigError::InvalidParam {
                field: "salt_bytes",
                reason: format!("{} not in [8, 32]", self.salt_bytes),
            });
        }
        if !(1..=8).contains(&self.tag_bytes) {
            return Err(ConfigError::InvalidParam {
                field: "tag_bytes",
                reason: format!("{} not in [1, 8]", self.tag_bytes),
            });
        }
        if !self.table_factor.is_finite() || self.table_factor <= 1.0 {
            return Err(ConfigError::InvalidParam {
                field: "table_factor",
                reason: format!("{} must be a finite value above 1", self.table_factor),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidParam {
                field: "max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::InvalidParam {
                field: "workers",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(StoreConfig::default().validate().is_ok());
        assert!(StoreConfig::unpadded().validate().is_ok());
    }

    #[test]
    fn test_rejects_short_salt() {
        let config = StoreConfig {
            salt_bytes: 4,
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParam { field: "salt_bytes", .. })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: StoreConfig = serde_json::from_str(r#"{"tag_bytes": 2}"#).unwrap();
        assert_eq!(config.tag_bytes, 2);
        assert_eq!(config.salt_bytes, 8);
        assert!(config.pad_enabled);
    }
}
