//! Circular geofences and the enter/exit state machine.
//!
//! [`GeofenceSet`] is the pure part of geofencing: feed it positions, get back
//! transitions. It knows nothing about subscriptions or callbacks; see
//! [`crate::monitor`] for that.

use crate::{haversine_distance_meters, Coordinate, GeoError, Located, Result};
use serde::{Deserialize, Serialize};

/// A named circular region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    /// Unique identifier (usually the mall id)
    pub id: String,
    /// Display name carried on events
    pub name: String,
    /// Center of the region
    pub center: Coordinate,
    /// Radius in meters, always > 0
    pub radius_meters: f64,
}

impl Geofence {
    /// Creates a geofence, validating the center and radius.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        center: Coordinate,
        radius_meters: f64,
    ) -> Result<Self> {
        if !center.is_valid() {
            return Err(GeoError::InvalidCoordinate(format!(
                "geofence center ({}, {})",
                center.latitude, center.longitude
            )));
        }
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return Err(GeoError::InvalidRadius(radius_meters));
        }

        Ok(Self {
            id: id.into(),
            name: name.into(),
            center,
            radius_meters,
        })
    }

    /// Draws a geofence of `radius_meters` around a located entity.
    pub fn around<E: Located + ?Sized>(entity: &E, radius_meters: f64) -> Result<Self> {
        let center = entity.coordinate().ok_or_else(|| {
            GeoError::InvalidCoordinate(format!("entity {} has no location", entity.id()))
        })?;
        Self::new(entity.id(), entity.name(), center, radius_meters)
    }

    /// Distance from the center to `position`, in meters.
    #[inline]
    pub fn distance_meters(&self, position: &Coordinate) -> f64 {
        haversine_distance_meters(&self.center, position)
    }

    /// True if `position` lies on or inside the boundary.
    #[inline]
    pub fn contains(&self, position: &Coordinate) -> bool {
        self.distance_meters(position) <= self.radius_meters
    }
}

/// Direction of a boundary crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    /// Moved from outside to inside
    Enter,
    /// Moved from inside to outside
    Exit,
}

/// A boundary crossing detected on a position sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceEvent {
    pub geofence_id: String,
    pub name: String,
    pub transition: Transition,
    /// The sample that triggered the transition
    pub position: Coordinate,
    pub distance_meters: f64,
}

#[derive(Debug, Clone)]
struct TrackedFence {
    fence: Geofence,
    inside: bool,
}

/// An ordered set of geofences with per-fence inside/outside state.
///
/// Every fence starts outside. The state is private; it can only be
/// observed through the events returned by [`GeofenceSet::update`].
#[derive(Debug, Clone, Default)]
pub struct GeofenceSet {
    fences: Vec<TrackedFence>,
}

impl GeofenceSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds one fence per entity, skipping entities without a valid location.
    pub fn from_entities<E: Located>(entities: &[E], radius_meters: f64) -> Result<Self> {
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return Err(GeoError::InvalidRadius(radius_meters));
        }

        let mut set = Self::new();
        for entity in entities {
            match Geofence::around(entity, radius_meters) {
                Ok(fence) => {
                    set.insert(fence);
                }
                Err(err) => tracing::debug!(id = entity.id(), %err, "Skipping geofence"),
            }
        }
        Ok(set)
    }

    /// Adds a fence, or replaces the definition of one with the same id.
    ///
    /// A replaced fence keeps its position in the set and its inside flag, so
    /// the next sample reports an exit only if the user is no longer inside.
    /// Returns true if the id was new.
    pub fn insert(&mut self, fence: Geofence) -> bool {
        if let Some(existing) = self.fences.iter_mut().find(|t| t.fence.id == fence.id) {
            existing.fence = fence;
            false
        } else {
            self.fences.push(TrackedFence { fence, inside: false });
            true
        }
    }

    /// Removes a fence by id.
    pub fn remove(&mut self, id: &str) -> Option<Geofence> {
        let index = self.fences.iter().position(|t| t.fence.id == id)?;
        Some(self.fences.remove(index).fence)
    }

    /// Removes every fence.
    pub fn clear(&mut self) {
        self.fences.clear();
    }

    /// Marks every fence as outside without changing the definitions.
    pub fn reset_state(&mut self) {
        for tracked in &mut self.fences {
            tracked.inside = false;
        }
    }

    /// Replaces the whole set; all fences start outside again.
    pub fn replace_with(&mut self, fences: impl IntoIterator<Item = Geofence>) {
        self.clear();
        for fence in fences {
            self.insert(fence);
        }
    }

    pub fn len(&self) -> usize {
        self.fences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fences.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Geofence> {
        self.fences.iter().find(|t| t.fence.id == id).map(|t| &t.fence)
    }

    /// Fences in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Geofence> {
        self.fences.iter().map(|t| &t.fence)
    }

    /// Applies one position sample and returns the transitions it caused, in
    /// insertion order.
    ///
    /// Fences whose state did not change produce nothing, so a stationary user
    /// never sees repeated events. An invalid sample is discarded without
    /// touching any state.
    pub fn update(&mut self, position: Coordinate) -> Vec<GeofenceEvent> {
        if !position.is_valid() {
            tracing::warn!(
                latitude = position.latitude,
                longitude = position.longitude,
                "Discarding invalid position sample"
            );
            return Vec::new();
        }

        let mut events = Vec::new();
        for tracked in &mut self.fences {
            let distance_meters = tracked.fence.distance_meters(&position);
            let currently_inside = distance_meters <= tracked.fence.radius_meters;

            if currently_inside == tracked.inside {
                continue;
            }
            tracked.inside = currently_inside;

            let transition = if currently_inside {
                Transition::Enter
            } else {
                Transition::Exit
            };
            tracing::debug!(
                geofence_id = %tracked.fence.id,
                ?transition,
                distance_meters,
                "Geofence transition"
            );
            events.push(GeofenceEvent {
                geofence_id: tracked.fence.id.clone(),
                name: tracked.fence.name.clone(),
                transition,
                position,
                distance_meters,
            });
        }
        events
    }
}
