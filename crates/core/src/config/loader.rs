//! Configuration file loading

use super::schema::ConfigSchema;
use crate::error::{Error, ErrorCode, Result, ResultExt};
use std::path::Path;

/// Environment variable overriding `proximity.radius_km`
pub const RADIUS_ENV_VAR: &str = "MALLRADAR_RADIUS_KM";

/// Configuration wrapper
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed and validated settings
    pub schema: ConfigSchema,
    /// File the settings came from, if any
    pub path: Option<String>,
}

impl Config {
    /// Load configuration from a file path or use defaults
    ///
    /// An explicit `path` must exist. Without one, the standard locations are
    /// searched and defaults are used when none is found. Environment
    /// overrides are applied last, then the result is validated.
    pub fn load(path: Option<&str>) -> Result<Self> {
        if let Some(p) = path {
            if !Path::new(p).exists() {
                return Err(Error::config_not_found(p));
            }
        }

        let config_path = path.map(String::from).or_else(find_config_file);

        let mut schema = if let Some(ref p) = config_path {
            load_config_file(p)?
        } else {
            ConfigSchema::default()
        };

        apply_env_overrides(&mut schema, std::env::var(RADIUS_ENV_VAR).ok().as_deref())?;
        schema.validate()?;

        Ok(Self {
            schema,
            path: config_path,
        })
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let schema: ConfigSchema = toml::from_str(content)?;
        schema.validate()?;
        Ok(Self { schema, path: None })
    }
}

/// Find configuration file in standard locations
fn find_config_file() -> Option<String> {
    let candidates = [
        ".mallradar.toml",
        "mallradar.toml",
        ".config/mallradar.toml",
    ];

    candidates
        .into_iter()
        .find(|candidate| Path::new(candidate).exists())
        .map(String::from)
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &str) -> Result<ConfigSchema> {
    let content = std::fs::read_to_string(path)
        .map_err(Error::from)
        .context(format!("Failed to read config file {path}"))?;

    toml::from_str::<ConfigSchema>(&content)
        .map_err(Error::from)
        .context(format!("Failed to parse config file {path}"))
}

fn apply_env_overrides(schema: &mut ConfigSchema, radius: Option<&str>) -> Result<()> {
    if let Some(raw) = radius {
        schema.proximity.radius_km = raw.trim().parse().map_err(|_| {
            Error::new(
                ErrorCode::InvalidConfigValue,
                format!("{RADIUS_ENV_VAR} is not a number: {raw}"),
            )
        })?;
    }
    Ok(())
}
