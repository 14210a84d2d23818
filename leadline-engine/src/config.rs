//! Engine configuration.
//!
//! All fields are required unless explicitly marked optional. No defaults.

use leadline_core::ConfigError;
use serde::{Deserialize, Serialize};

/// Configuration for the pipeline engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Interval between background refetches, in milliseconds.
    pub refresh_interval_ms: u64,
    /// Capacity of the channel the five stream listeners forward into.
    pub channel_capacity: usize,
    pub reconnect: ReconnectConfig,
}

/// Reconnect backoff for the change-stream listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
    pub multiplier: f64,
    pub jitter_ms: u64,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "refresh_interval_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "channel_capacity",
                reason: "must be > 0".to_string(),
            });
        }
        if self.reconnect.initial_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "reconnect.initial_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.reconnect.max_ms < self.reconnect.initial_ms {
            return Err(ConfigError::InvalidValue {
                field: "reconnect.max_ms",
                reason: "must be >= initial_ms".to_string(),
            });
        }
        if self.reconnect.multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "reconnect.multiplier",
                reason: "must be >= 1.0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> EngineConfig {
        EngineConfig {
            refresh_interval_ms: 2_000,
            channel_capacity: 256,
            reconnect: ReconnectConfig {
                initial_ms: 250,
                max_ms: 5_000,
                multiplier: 1.5,
                jitter_ms: 100,
            },
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_zero_refresh_interval_rejected() {
        let mut config = base_config();
        config.refresh_interval_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "refresh_interval_ms"
        ));
    }

    #[test]
    fn test_zero_channel_capacity_rejected() {
        let mut config = base_config();
        config.channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backoff_max_below_initial_rejected() {
        let mut config = base_config();
        config.reconnect.max_ms = 100;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "reconnect.max_ms"
        ));
    }

    #[test]
    fn test_backoff_multiplier_below_one_rejected() {
        let mut config = base_config();
        config.reconnect.multiplier = 0.5;
        assert!(config.validate().is_err());
    }
}
