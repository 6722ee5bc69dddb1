//! Haversine distance calculation.
//!
//! The Haversine formula calculates the great-circle distance between two points
//! on a sphere given their longitudes and latitudes.
//!
//! Every function here returns `f64::INFINITY` when either coordinate fails
//! [`Coordinate::is_valid`]. A bad coordinate is unreachable; it never reads
//! as "same place" (`0`) and never leaks `NaN` into comparisons.

use crate::Coordinate;

/// Earth's mean radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Earth's mean radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculates the great-circle distance between two coordinates in kilometers.
///
/// Uses the Haversine formula for accurate distance calculation on a sphere.
///
/// # Arguments
/// * `from` - Starting coordinate
/// * `to` - Ending coordinate
///
/// # Returns
/// Distance in kilometers, or `f64::INFINITY` if either coordinate is invalid
///
/// # Example
/// ```
/// use mallradar_geo::{haversine_distance, Coordinate};
///
/// let new_york = Coordinate::new(40.7128, -74.0060);
/// let los_angeles = Coordinate::new(34.0522, -118.2437);
///
/// let distance = haversine_distance(&new_york, &los_angeles);
/// assert!((distance - 3936.0).abs() < 20.0);
///
/// let broken = Coordinate::new(f64::NAN, 0.0);
/// assert!(haversine_distance(&new_york, &broken).is_infinite());
/// ```
#[inline]
pub fn haversine_distance(from: &Coordinate, to: &Coordinate) -> f64 {
    haversine_distance_with_radius(from, to, EARTH_RADIUS_KM)
}

/// Calculates the great-circle distance between two coordinates in meters.
///
/// # Returns
/// Distance in meters, or `f64::INFINITY` if either coordinate is invalid
#[inline]
pub fn haversine_distance_meters(from: &Coordinate, to: &Coordinate) -> f64 {
    haversine_distance_with_radius(from, to, EARTH_RADIUS_M)
}

#[inline]
fn haversine_distance_with_radius(from: &Coordinate, to: &Coordinate, radius: f64) -> f64 {
    if !from.is_valid() || !to.is_valid() {
        return f64::INFINITY;
    }

    let (lat1, lon1) = from.to_radians();
    let (lat2, lon2) = to.to_radians();

    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    // Rounding can push `a` a hair past 1.0 for antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    radius * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Test data: known distances between cities
    const NEW_YORK: Coordinate = Coordinate { latitude: 40.7128, longitude: -74.0060 };
    const LOS_ANGELES: Coordinate = Coordinate { latitude: 34.0522, longitude: -118.2437 };
    const MEXICO_CITY: Coordinate = Coordinate { latitude: 19.4326, longitude: -99.1332 };

    #[test]
    fn test_one_degree_of_longitude_at_equator() {
        let distance = haversine_distance(&Coordinate::new(0.0, 0.0), &Coordinate::new(0.0, 1.0));
        assert!((distance - 111.19).abs() < 0.5, "1 degree: {}", distance);
    }

    #[test]
    fn test_new_york_to_los_angeles() {
        let distance = haversine_distance(&NEW_YORK, &LOS_ANGELES);
        // Expected: ~3,936 km
        assert!((distance - 3936.0).abs() < 20.0, "NYC-LA: {}", distance);
    }

    #[test]
    fn test_mexico_city_to_new_york() {
        let distance = haversine_distance(&MEXICO_CITY, &NEW_YORK);
        assert!((distance - 3362.0).abs() < 20.0, "CDMX-NYC: {}", distance);
    }

    #[test]
    fn test_same_point_zero_distance() {
        let distance = haversine_distance(&MEXICO_CITY, &MEXICO_CITY);
        assert_eq!(distance, 0.0);
    }

    #[test]
    fn test_meters_conversion() {
        let km = haversine_distance(&NEW_YORK, &LOS_ANGELES);
        let meters = haversine_distance_meters(&NEW_YORK, &LOS_ANGELES);
        assert!((meters - km * 1000.0).abs() < 1.0);
    }

    #[test]
    fn test_invalid_input_is_unreachable() {
        let nan = Coordinate::new(f64::NAN, -99.0);
        let out_of_range = Coordinate::new(19.0, 200.0);

        assert_eq!(haversine_distance(&MEXICO_CITY, &nan), f64::INFINITY);
        assert_eq!(haversine_distance(&nan, &MEXICO_CITY), f64::INFINITY);
        assert_eq!(haversine_distance_meters(&out_of_range, &MEXICO_CITY), f64::INFINITY);
    }

    #[test]
    fn test_antipodal_points_do_not_produce_nan() {
        let distance = haversine_distance(&Coordinate::new(0.0, 0.0), &Coordinate::new(0.0, 180.0));
        assert!(distance.is_finite());
        assert!((distance - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 0.01);
    }

    fn coordinate() -> impl Strategy<Value = Coordinate> {
        (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lng)| Coordinate::new(lat, lng))
    }

    proptest! {
        #[test]
        fn prop_symmetric(a in coordinate(), b in coordinate()) {
            let d1 = haversine_distance(&a, &b);
            let d2 = haversine_distance(&b, &a);
            prop_assert!((d1 - d2).abs() < 1e-6);
        }

        #[test]
        fn prop_identity(a in coordinate()) {
            prop_assert!(haversine_distance(&a, &a).abs() < 1e-9);
        }

        #[test]
        fn prop_non_negative_and_bounded(a in coordinate(), b in coordinate()) {
            let d = haversine_distance(&a, &b);
            prop_assert!(d >= 0.0);
            prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
        }

        #[test]
        fn prop_triangle_inequality(a in coordinate(), b in coordinate(), c in coordinate()) {
            let ac = haversine_distance(&a, &c);
            let ab = haversine_distance(&a, &b);
            let bc = haversine_distance(&b, &c);
            prop_assert!(ac <= ab + bc + 1e-3);
        }
    }
}
