//! WASM bindings for the geo crate.
//!
//! Lets the web app run the same proximity rules as native clients. Entities
//! cross the boundary as JSON arrays of `{id, latitude, longitude}` objects
//! (`lat`/`lng` are accepted too); missing or `null` coordinates are allowed.

use crate::{haversine_distance, Coordinate, GeoError, Located};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[derive(Debug, Deserialize)]
struct WasmEntity {
    id: String,
    #[serde(default, alias = "lat")]
    latitude: Option<f64>,
    #[serde(default, alias = "lng", alias = "lon")]
    longitude: Option<f64>,
}

impl Located for WasmEntity {
    fn id(&self) -> &str {
        &self.id
    }

    fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::from_parts(self.latitude, self.longitude)
    }
}

#[derive(Debug, Serialize)]
struct WasmResult<'a> {
    id: &'a str,
    distance_km: Option<f64>,
}

/// Calculate distance between two coordinates.
///
/// # Returns
/// Distance in kilometers, or `Infinity` if either point is invalid
#[wasm_bindgen]
pub fn distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let from = Coordinate::new(lat1, lng1);
    let to = Coordinate::new(lat2, lng2);
    haversine_distance(&from, &to)
}

/// Filter entities within a radius of the user, closest first.
///
/// # Arguments
/// * `user_lat` - User's latitude
/// * `user_lng` - User's longitude
/// * `entities_json` - JSON array of entities
/// * `radius_km` - Maximum distance in kilometers (inclusive)
///
/// # Returns
/// JSON array of `{id, distance_km}`
#[wasm_bindgen]
pub fn filter_within_radius(
    user_lat: f64,
    user_lng: f64,
    entities_json: &str,
    radius_km: f64,
) -> Result<String, JsValue> {
    let user = Coordinate::new(user_lat, user_lng);
    filter_json(Some(user), radius_km, entities_json).map_err(to_js)
}

/// Every entity in input order without distances, for when the user
/// location is unknown.
#[wasm_bindgen]
pub fn filter_all(entities_json: &str) -> Result<String, JsValue> {
    filter_json(None, 0.0, entities_json).map_err(to_js)
}

fn filter_json(user: Option<Coordinate>, radius_km: f64, entities_json: &str) -> crate::Result<String> {
    let entities: Vec<WasmEntity> = serde_json::from_str(entities_json)?;
    let results: Vec<WasmResult<'_>> = crate::filter_within_radius(user, radius_km, &entities)
        .into_iter()
        .map(|r| WasmResult {
            id: &r.entity.id,
            distance_km: r.distance_km,
        })
        .collect();
    Ok(serde_json::to_string(&results)?)
}

fn to_js(err: GeoError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTITIES: &str = r#"[
        {"id": "far", "latitude": 19.50, "longitude": -99.13},
        {"id": "near", "lat": 19.4300, "lng": -99.1300},
        {"id": "nowhere", "latitude": null},
        {"id": "ny", "latitude": 40.7128, "longitude": -74.0060}
    ]"#;

    #[test]
    fn test_filter_json_sorted() {
        let json = filter_json(Some(Coordinate::new(19.4326, -99.1332)), 50.0, ENTITIES).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let ids: Vec<_> = value.as_array().unwrap().iter().map(|v| v["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["near", "far"]);
    }

    #[test]
    fn test_filter_json_without_location() {
        let json = filter_json(None, 0.0, ENTITIES).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 4);
        assert!(value[0]["distance_km"].is_null());
    }

    #[test]
    fn test_filter_json_rejects_bad_input() {
        assert!(matches!(filter_json(None, 0.0, "not json"), Err(GeoError::JsonError(_))));
    }
}
