//! Location-aware proximity engine for MallRadar.
//!
//! This crate provides:
//! - Haversine distance calculations with a single invalid-input policy
//! - Radius filtering and distance ordering for malls and stores
//! - Active promotion lookup near the user
//! - Geofence monitoring over a pluggable location source, with bounded retry
//! - WASM bindings for browser usage
//!
//! # Example
//!
//! ```
//! use mallradar_geo::{filter_within_radius, Coordinate, Mall};
//!
//! let user = Coordinate::new(19.4326, -99.1332); // Mexico City
//! let malls = vec![
//!     Mall::new("zocalo", "Plaza Zócalo", 19.4300, -99.1300),
//!     Mall::new("hudson", "Hudson Yards", 40.7128, -74.0060),
//! ];
//!
//! let nearby = filter_within_radius(Some(user), 50.0, &malls);
//! assert_eq!(nearby.len(), 1);
//! assert_eq!(nearby[0].entity.id, "zocalo");
//! ```

mod entity;
mod error;
mod haversine;
pub mod geofence;
pub mod location;
pub mod monitor;
pub mod promotion;
pub mod proximity;

#[cfg(feature = "wasm")]
mod wasm;

pub use entity::{Mall, Store};
pub use error::{GeoError, GeoErrorCode, Result};
pub use geofence::{Geofence, GeofenceEvent, GeofenceSet, Transition};
pub use haversine::{haversine_distance, haversine_distance_meters, EARTH_RADIUS_KM, EARTH_RADIUS_M};
pub use location::{
    LocationError, LocationSource, PositionObserver, PositionProvider, PushLocationSource,
    RetryingSource, Subscription, UnavailableReason,
};
pub use monitor::{GeofenceHandler, GeofenceMonitor, MonitorEvent, MonitorStatus};
pub use promotion::{active_promotions, nearby_promotions, Promotion};
pub use proximity::{filter_within_radius, nearest, Located, ProximityQuery, ProximityResult};

/// A geographic coordinate with latitude and longitude.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    #[serde(alias = "lat")]
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate without validating it.
    ///
    /// Distance functions treat an invalid coordinate as unreachable, so this
    /// is safe to use with raw device or database values.
    ///
    /// # Arguments
    /// * `latitude` - Latitude in degrees (-90 to 90)
    /// * `longitude` - Longitude in degrees (-180 to 180)
    #[inline]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Creates a coordinate, rejecting non-finite or out-of-range values.
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self> {
        let coord = Self::new(latitude, longitude);
        if coord.is_valid() {
            Ok(coord)
        } else {
            Err(GeoError::InvalidCoordinate(format!("({latitude}, {longitude})")))
        }
    }

    /// Builds a coordinate from optional columns, as stored on mall and store rows.
    ///
    /// Returns `None` when either value is missing or the pair is invalid.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        let coord = Self::new(latitude?, longitude?);
        coord.is_valid().then_some(coord)
    }

    /// Returns true if both values are finite and within range.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Converts degrees to radians for internal calculations.
    #[inline]
    pub(crate) fn to_radians(self) -> (f64, f64) {
        (self.latitude.to_radians(), self.longitude.to_radians())
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_creation() {
        let coord = Coordinate::new(19.4326, -99.1332);
        assert_eq!(coord.latitude, 19.4326);
        assert_eq!(coord.longitude, -99.1332);
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(0.0, 0.0).is_valid());
        assert!(Coordinate::new(90.0, 180.0).is_valid());
        assert!(Coordinate::new(-90.0, -180.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_try_new_rejects_invalid() {
        assert!(Coordinate::try_new(19.4, -99.1).is_ok());
        let err = Coordinate::try_new(f64::NAN, 10.0).unwrap_err();
        assert_eq!(err.code(), GeoErrorCode::InvalidCoordinate);
    }

    #[test]
    fn test_from_parts() {
        assert!(Coordinate::from_parts(Some(1.0), Some(2.0)).is_some());
        assert!(Coordinate::from_parts(Some(1.0), None).is_none());
        assert!(Coordinate::from_parts(None, Some(2.0)).is_none());
        assert!(Coordinate::from_parts(Some(f64::NAN), Some(2.0)).is_none());
    }

    #[test]
    fn test_coordinate_from_tuple() {
        let coord: Coordinate = (19.4326, -99.1332).into();
        assert_eq!(coord.latitude, 19.4326);
    }

    #[test]
    fn test_deserialize_short_keys() {
        let coord: Coordinate = serde_json::from_str(r#"{"lat": 19.43, "lng": -99.13}"#).unwrap();
        assert_eq!(coord, Coordinate::new(19.43, -99.13));
    }
}
