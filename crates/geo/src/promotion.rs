//! Time-bound promotions and their placement on the map.

use crate::proximity::{filter_within_radius, Located, ProximityResult};
use crate::{Coordinate, Mall, Store};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A promotion run by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
    pub id: String,
    pub store_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl Promotion {
    /// True while `starts_at <= now < ends_at`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now < self.ends_at
    }
}

/// Promotions running at `now`, in input order.
pub fn active_promotions(promotions: &[Promotion], now: DateTime<Utc>) -> Vec<&Promotion> {
    promotions.iter().filter(|p| p.is_active_at(now)).collect()
}

/// A promotion pinned to the position of its store, or of the store's mall.
struct Placed<'a> {
    promotion: &'a Promotion,
    coordinate: Option<Coordinate>,
}

impl Located for Placed<'_> {
    fn id(&self) -> &str {
        &self.promotion.id
    }

    fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }

    fn name(&self) -> &str {
        &self.promotion.title
    }
}

/// Active promotions within `radius_km` of `user`, closest first.
///
/// A promotion is placed at its store; a store without a coordinate falls
/// back to its mall. Promotions that cannot be placed are dropped when a
/// user location is known. Without one every active promotion is returned
/// in input order, matching [`filter_within_radius`].
pub fn nearby_promotions<'a>(
    user: Option<Coordinate>,
    radius_km: f64,
    promotions: &'a [Promotion],
    stores: &[Store],
    malls: &[Mall],
    now: DateTime<Utc>,
) -> Vec<ProximityResult<'a, Promotion>> {
    let stores: HashMap<&str, &Store> = stores.iter().map(|s| (s.id.as_str(), s)).collect();
    let malls: HashMap<&str, &Mall> = malls.iter().map(|m| (m.id.as_str(), m)).collect();

    let placed: Vec<Placed<'a>> = active_promotions(promotions, now)
        .into_iter()
        .map(|promotion| Placed {
            promotion,
            coordinate: stores
                .get(promotion.store_id.as_str())
                .and_then(|store| {
                    store.coordinate().or_else(|| {
                        store
                            .mall_id
                            .as_deref()
                            .and_then(|id| malls.get(id))
                            .and_then(|mall| mall.coordinate())
                    })
                }),
        })
        .collect();

    filter_within_radius(user, radius_km, &placed)
        .into_iter()
        .map(|result| ProximityResult {
            entity: result.entity.promotion,
            distance_km: result.distance_km,
        })
        .collect()
}
