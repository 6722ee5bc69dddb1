//! Core utilities shared by the MallRadar crates
//!
//! This crate provides the ambient plumbing used by the proximity engine:
//!
//! - **Error handling**: structured errors with codes, context, and recovery suggestions
//! - **Configuration**: TOML-based configuration with validation and env overrides
//! - **Retry policy**: exponential backoff parameters for location re-subscription
//!
//! # Example
//!
//! ```rust,no_run
//! use mallradar_core::config::Config;
//!
//! let config = Config::load(None).expect("invalid configuration");
//! println!("search radius: {} km", config.schema.proximity.radius_km);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod retry;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigSchema, GeofenceConfig, ProximityConfig, RetrySettings};
    pub use crate::error::{Error, ErrorCode, Result, ResultExt};
    pub use crate::retry::RetryConfig;
}
