//! Configuration schema definitions

use crate::error::{Error, Result};
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConfigSchema {
    /// Application-wide settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Nearby mall/store search
    #[serde(default)]
    pub proximity: ProximityConfig,

    /// Geofence monitoring
    #[serde(default)]
    pub geofence: GeofenceConfig,

    /// Location watch retry policy
    #[serde(default)]
    pub retry: RetrySettings,
}

impl ConfigSchema {
    /// Check every section for values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.proximity.validate()?;
        self.geofence.validate()?;
        self.retry.validate()
    }
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// Default log filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Proximity search configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProximityConfig {
    /// Search radius in kilometers
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,

    /// Cap on the number of results (unlimited when absent)
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            radius_km: default_radius_km(),
            max_results: None,
        }
    }
}

impl ProximityConfig {
    fn validate(&self) -> Result<()> {
        if !self.radius_km.is_finite() || self.radius_km <= 0.0 {
            return Err(Error::config_invalid(
                "proximity.radius_km",
                format!("radius must be a positive number of kilometers, got {}", self.radius_km),
            ));
        }
        if self.max_results == Some(0) {
            return Err(Error::config_invalid(
                "proximity.max_results",
                "max_results must be at least 1; omit it for no limit",
            ));
        }
        Ok(())
    }
}

fn default_radius_km() -> f64 {
    50.0
}

/// Geofence configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeofenceConfig {
    /// Radius drawn around each mall, in meters
    #[serde(default = "default_radius_meters")]
    pub radius_meters: f64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            radius_meters: default_radius_meters(),
        }
    }
}

impl GeofenceConfig {
    fn validate(&self) -> Result<()> {
        if !self.radius_meters.is_finite() || self.radius_meters <= 0.0 {
            return Err(Error::config_invalid(
                "geofence.radius_meters",
                format!("radius must be a positive number of meters, got {}", self.radius_meters),
            ));
        }
        Ok(())
    }
}

fn default_radius_meters() -> f64 {
    500.0
}

/// Retry settings as written in TOML (milliseconds)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrySettings {
    /// Maximum consecutive attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Exponential growth factor
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Randomise delays by up to 25%
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

impl RetrySettings {
    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::config_invalid("retry.max_attempts", "max_attempts must be at least 1"));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::config_invalid(
                "retry.backoff_multiplier",
                format!("backoff_multiplier must be >= 1.0, got {}", self.backoff_multiplier),
            ));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(Error::config_invalid(
                "retry.initial_delay_ms",
                "initial_delay_ms must not exceed max_delay_ms",
            ));
        }
        Ok(())
    }

    /// Convert into the runtime retry policy.
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            jitter: self.jitter,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_defaults_are_valid() {
        let schema = ConfigSchema::default();
        assert!(schema.validate().is_ok());
        assert_eq!(schema.proximity.radius_km, 50.0);
        assert_eq!(schema.geofence.radius_meters, 500.0);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let schema: ConfigSchema = toml::from_str(
            r#"
            [proximity]
            radius_km = 10.0

            [retry]
            max_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(schema.proximity.radius_km, 10.0);
        assert_eq!(schema.proximity.max_results, None);
        assert_eq!(schema.retry.max_attempts, 5);
        assert_eq!(schema.retry.initial_delay_ms, 1_000);
        assert_eq!(schema.general.log_level, "info");
    }

    #[test]
    fn test_rejects_non_positive_radius() {
        let mut schema = ConfigSchema::default();
        schema.proximity.radius_km = 0.0;
        let err = schema.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigValidationError);

        let mut schema = ConfigSchema::default();
        schema.geofence.radius_meters = f64::NAN;
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let mut schema = ConfigSchema::default();
        schema.retry.max_attempts = 0;
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_retry_settings_conversion() {
        let settings = RetrySettings {
            initial_delay_ms: 250,
            max_delay_ms: 4_000,
            jitter: false,
            ..Default::default()
        };
        let config = settings.to_retry_config();

        assert_eq!(config.initial_delay, Duration::from_millis(250));
        assert_eq!(config.max_delay, Duration::from_secs(4));
        assert_eq!(config.max_attempts, 3);
        assert!(!config.jitter);
    }
}
