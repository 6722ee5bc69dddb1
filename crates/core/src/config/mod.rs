//! Configuration loading and schema definitions
//!
//! Shared configuration types consumed by the proximity engine.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
