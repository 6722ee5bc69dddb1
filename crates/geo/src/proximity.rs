//! Radius filtering and distance ordering.
//!
//! This is the single place where user-to-entity distances are computed for
//! list views. Entities without a usable coordinate are skipped; they never
//! abort the query and never show up in filtered output.

use crate::{haversine_distance, Coordinate, GeoError, Result};
use mallradar_core::config::ProximityConfig;

/// Anything with an id and an optional position (malls, stores, ...).
pub trait Located {
    /// Unique identifier
    fn id(&self) -> &str;

    /// Position, or `None` if missing or invalid
    fn coordinate(&self) -> Option<Coordinate>;

    /// Human-readable label, used for geofence names
    fn name(&self) -> &str {
        self.id()
    }
}

impl<T: Located + ?Sized> Located for &T {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn coordinate(&self) -> Option<Coordinate> {
        (**self).coordinate()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// An entity paired with its distance from the user.
#[derive(Debug)]
pub struct ProximityResult<'a, E> {
    /// The matched entity
    pub entity: &'a E,
    /// Distance in kilometers; `None` when no user location was available
    pub distance_km: Option<f64>,
}

impl<E> Clone for ProximityResult<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for ProximityResult<'_, E> {}

/// Returns the entities within `radius_km` of `user`, closest first.
///
/// - With no user location (or an invalid one) every entity is returned in
///   input order without a distance, so the list degrades to "show all".
/// - Otherwise entities lacking a valid coordinate are dropped, the rest are
///   kept when `distance <= radius_km` and sorted ascending. Ties keep their
///   input order.
///
/// A non-positive or `NaN` radius matches nothing; use [`ProximityQuery`] to
/// reject such radii up front.
///
/// # Example
/// ```
/// use mallradar_geo::{filter_within_radius, Coordinate, Mall};
///
/// let malls = vec![Mall::new("a", "Far", 19.50, -99.13), Mall::new("b", "Near", 19.43, -99.13)];
/// let user = Coordinate::new(19.4326, -99.1332);
///
/// let results = filter_within_radius(Some(user), 50.0, &malls);
/// assert_eq!(results[0].entity.id, "b");
///
/// let everything = filter_within_radius(None, 50.0, &malls);
/// assert_eq!(everything.len(), 2);
/// assert!(everything[0].distance_km.is_none());
/// ```
pub fn filter_within_radius<'a, E>(
    user: Option<Coordinate>,
    radius_km: f64,
    entities: &'a [E],
) -> Vec<ProximityResult<'a, E>>
where
    E: Located + Sync,
{
    let Some(user) = usable_location(user) else {
        return entities
            .iter()
            .map(|entity| ProximityResult { entity, distance_km: None })
            .collect();
    };

    let mut results: Vec<ProximityResult<'a, E>> = entities
        .iter()
        .zip(distances_from(&user, entities))
        .filter(|(_, distance)| distance.is_finite() && *distance <= radius_km)
        .map(|(entity, distance)| ProximityResult {
            entity,
            distance_km: Some(distance),
        })
        .collect();

    // `sort_by` is stable; every kept distance is finite.
    results.sort_by(|a, b| sort_key(a).total_cmp(&sort_key(b)));

    tracing::debug!(
        total = entities.len(),
        kept = results.len(),
        radius_km,
        "Filtered entities by radius"
    );

    results
}

/// Returns the closest entity with a valid coordinate, ignoring any radius.
///
/// Equal distances resolve to the earliest entity in input order.
pub fn nearest<'a, E>(user: &Coordinate, entities: &'a [E]) -> Option<ProximityResult<'a, E>>
where
    E: Located + Sync,
{
    if !user.is_valid() {
        return None;
    }

    entities
        .iter()
        .zip(distances_from(user, entities))
        .filter(|(_, distance)| distance.is_finite())
        .fold(None, |best: Option<(&'a E, f64)>, (entity, distance)| match best {
            Some((_, best_distance)) if best_distance <= distance => best,
            _ => Some((entity, distance)),
        })
        .map(|(entity, distance)| ProximityResult {
            entity,
            distance_km: Some(distance),
        })
}

/// A validated, reusable proximity query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityQuery {
    radius_km: f64,
    limit: Option<usize>,
}

impl ProximityQuery {
    /// Creates a query, rejecting radii that are not positive and finite.
    pub fn new(radius_km: f64) -> Result<Self> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(GeoError::InvalidRadius(radius_km));
        }
        Ok(Self {
            radius_km,
            limit: None,
        })
    }

    /// Builds a query from the `[proximity]` config section.
    pub fn from_config(config: &ProximityConfig) -> Result<Self> {
        let query = Self::new(config.radius_km)?;
        match config.max_results {
            Some(limit) => query.with_limit(limit),
            None => Ok(query),
        }
    }

    /// Keep at most `limit` results. A limit of zero is rejected with
    /// [`GeoError::InvalidLimit`].
    pub fn with_limit(mut self, limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(GeoError::InvalidLimit(limit));
        }
        self.limit = Some(limit);
        Ok(self)
    }

    /// Search radius in kilometers.
    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// Runs [`filter_within_radius`] and applies the result limit, which also
    /// caps the unfiltered list returned when no location is known.
    pub fn run<'a, E>(&self, user: Option<Coordinate>, entities: &'a [E]) -> Vec<ProximityResult<'a, E>>
    where
        E: Located + Sync,
    {
        let mut results = filter_within_radius(user, self.radius_km, entities);
        if let Some(limit) = self.limit {
            results.truncate(limit);
        }
        results
    }
}

fn usable_location(user: Option<Coordinate>) -> Option<Coordinate> {
    match user {
        Some(coord) if coord.is_valid() => Some(coord),
        Some(coord) => {
            tracing::warn!(
                latitude = coord.latitude,
                longitude = coord.longitude,
                "Ignoring invalid user location; showing all entities"
            );
            None
        }
        None => None,
    }
}

#[inline]
fn sort_key<E>(result: &ProximityResult<'_, E>) -> f64 {
    result.distance_km.unwrap_or(f64::INFINITY)
}

#[inline]
fn distance_to<E: Located>(user: &Coordinate, entity: &E) -> f64 {
    entity
        .coordinate()
        .map_or(f64::INFINITY, |coord| haversine_distance(user, &coord))
}

/// Distances in input order, `f64::INFINITY` for unlocated entities.
fn distances_from<E: Located + Sync>(user: &Coordinate, entities: &[E]) -> Vec<f64> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        entities
            .par_iter()
            .map(|entity| distance_to(user, entity))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        entities
            .iter()
            .map(|entity| distance_to(user, entity))
            .collect()
    }
}
