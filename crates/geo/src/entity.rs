//! Mall and store records as delivered by the backend.
//!
//! Rows come straight from the hosted database, so location columns are
//! optional and may hold garbage. [`Located::coordinate`] returns `None` for
//! anything that is not a usable coordinate.

use crate::{Coordinate, Located};
use serde::{Deserialize, Serialize};

/// A shopping mall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mall {
    /// Primary key
    pub id: String,
    /// Display name
    pub name: String,
    /// Street address
    #[serde(default)]
    pub address: Option<String>,
    /// Latitude column
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude column
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Mall {
    /// Creates a mall at the given position.
    pub fn new(id: impl Into<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: None,
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }

    /// Creates a mall with no stored position.
    pub fn unlocated(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: None,
            latitude: None,
            longitude: None,
        }
    }
}

impl Located for Mall {
    fn id(&self) -> &str {
        &self.id
    }

    fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::from_parts(self.latitude, self.longitude)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A store, optionally inside a mall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    /// Primary key
    pub id: String,
    /// Owning mall, if the store is inside one
    #[serde(default)]
    pub mall_id: Option<String>,
    /// Display name
    pub name: String,
    /// Latitude column
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude column
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Store {
    /// Creates a free-standing store at the given position.
    pub fn new(id: impl Into<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            mall_id: None,
            name: name.into(),
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }

    /// Creates a store inside `mall_id` that has no position of its own.
    pub fn in_mall(id: impl Into<String>, name: impl Into<String>, mall_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mall_id: Some(mall_id.into()),
            name: name.into(),
            latitude: None,
            longitude: None,
        }
    }
}

impl Located for Store {
    fn id(&self) -> &str {
        &self.id
    }

    fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::from_parts(self.latitude, self.longitude)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
