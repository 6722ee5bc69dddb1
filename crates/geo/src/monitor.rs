//! Geofence monitoring over a live location source.
//!
//! [`GeofenceMonitor`] owns a [`GeofenceSet`], a [`GeofenceHandler`] and a
//! [`LocationSource`]. Construct one per screen or per test; there is no
//! global instance.
//!
//! All callbacks run while the monitor's lock is held, which gives two
//! guarantees: transitions for one sample are delivered in fence order before
//! the next sample is looked at, and once [`GeofenceMonitor::stop_monitoring`]
//! returns no handler method runs again for that session. Handlers therefore
//! must not call back into the monitor.

use crate::location::{lock, LocationError, LocationSource, PositionObserver, Subscription};
use crate::{Coordinate, Geofence, GeofenceEvent, GeofenceSet, Located, Result, Transition};
use mallradar_core::config::GeofenceConfig;
use serde::Serialize;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// Receives geofence transitions and location failures.
pub trait GeofenceHandler: Send + 'static {
    fn on_enter(&mut self, event: &GeofenceEvent);

    fn on_exit(&mut self, event: &GeofenceEvent);

    /// The location stream failed for good; monitoring has stopped.
    fn on_error(&mut self, error: &LocationError);

    /// The location stream failed but a retry is pending.
    fn on_retry(&mut self, _error: &LocationError, _attempt: u32, _delay: Duration) {}
}

/// Everything a monitor reports, as a single value for channel consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MonitorEvent {
    Transition(GeofenceEvent),
    Retrying {
        error: String,
        attempt: u32,
        delay_ms: u64,
    },
    Failed {
        error: String,
        #[serde(skip)]
        source: LocationError,
    },
}

impl GeofenceHandler for Sender<MonitorEvent> {
    fn on_enter(&mut self, event: &GeofenceEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.send(MonitorEvent::Transition(event.clone()));
    }

    fn on_exit(&mut self, event: &GeofenceEvent) {
        let _ = self.send(MonitorEvent::Transition(event.clone()));
    }

    fn on_error(&mut self, error: &LocationError) {
        let _ = self.send(MonitorEvent::Failed {
            error: error.to_string(),
            source: error.clone(),
        });
    }

    fn on_retry(&mut self, error: &LocationError, attempt: u32, delay: Duration) {
        let _ = self.send(MonitorEvent::Retrying {
            error: error.to_string(),
            attempt,
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        });
    }
}

/// Whether the monitor is consuming positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorStatus {
    /// Not started, or stopped by the caller
    Idle,
    /// Subscribed to the location source
    Monitoring,
    /// Stopped because the location source failed
    Failed(LocationError),
}

struct MonitorShared {
    fences: GeofenceSet,
    handler: Box<dyn GeofenceHandler>,
    status: MonitorStatus,
    session: u64,
    subscription: Option<Subscription>,
}

impl MonitorShared {
    fn is_current(&self, session: u64) -> bool {
        self.session == session && self.status == MonitorStatus::Monitoring
    }
}

/// Watches a location source and reports geofence crossings.
pub struct GeofenceMonitor<S: LocationSource> {
    source: S,
    shared: Arc<Mutex<MonitorShared>>,
}

impl<S: LocationSource> GeofenceMonitor<S> {
    /// Creates an idle monitor with no geofences.
    pub fn new(source: S, handler: impl GeofenceHandler) -> Self {
        Self::with_geofences(source, handler, GeofenceSet::new())
    }

    /// Creates an idle monitor tracking `fences`.
    pub fn with_geofences(source: S, handler: impl GeofenceHandler, fences: GeofenceSet) -> Self {
        Self {
            source,
            shared: Arc::new(Mutex::new(MonitorShared {
                fences,
                handler: Box::new(handler),
                status: MonitorStatus::Idle,
                session: 0,
                subscription: None,
            })),
        }
    }

    /// Creates an idle monitor with one geofence per located entity, sized by
    /// the `[geofence]` config section.
    pub fn for_entities<E: Located>(
        source: S,
        handler: impl GeofenceHandler,
        entities: &[E],
        config: &GeofenceConfig,
    ) -> Result<Self> {
        let fences = GeofenceSet::from_entities(entities, config.radius_meters)?;
        Ok(Self::with_geofences(source, handler, fences))
    }

    /// Adds or redefines a geofence. Takes effect on the next sample.
    pub fn add_geofence(&self, fence: Geofence) -> bool {
        lock(&self.shared).fences.insert(fence)
    }

    /// Stops tracking a geofence. No exit is reported for it.
    pub fn remove_geofence(&self, id: &str) -> Option<Geofence> {
        lock(&self.shared).fences.remove(id)
    }

    /// Stops tracking every geofence.
    pub fn clear(&self) {
        lock(&self.shared).fences.clear();
    }

    /// Swaps in a new fence list (e.g. after the mall list reloads). Every
    /// fence starts outside.
    pub fn replace_geofences(&self, fences: impl IntoIterator<Item = Geofence>) {
        lock(&self.shared).fences.replace_with(fences);
    }

    pub fn geofence_count(&self) -> usize {
        lock(&self.shared).fences.len()
    }

    pub fn status(&self) -> MonitorStatus {
        lock(&self.shared).status.clone()
    }

    pub fn is_monitoring(&self) -> bool {
        lock(&self.shared).status == MonitorStatus::Monitoring
    }

    /// Subscribes to the location source. A no-op while already monitoring;
    /// restarts after a failure.
    ///
    /// Each session starts with every fence outside, so the first sample
    /// inside a fence reports an enter and samples outside report nothing.
    pub fn start_monitoring(&self) {
        let session = {
            let mut shared = lock(&self.shared);
            if shared.status == MonitorStatus::Monitoring {
                return;
            }
            shared.fences.reset_state();
            shared.session += 1;
            shared.status = MonitorStatus::Monitoring;
            shared.session
        };

        let observer = Arc::new(SessionObserver {
            shared: Arc::downgrade(&self.shared),
            session,
        });
        let subscription = self.source.subscribe(observer);

        // Stopped or failed while subscribing: release it right away.
        let _stale = {
            let mut shared = lock(&self.shared);
            if shared.is_current(session) {
                shared.subscription.replace(subscription)
            } else {
                Some(subscription)
            }
        };

        tracing::info!(session, "Geofence monitoring started");
    }

    /// Unsubscribes from the location source. Idempotent.
    ///
    /// Blocks until any in-flight callback finishes; nothing is delivered to
    /// the handler after this returns.
    pub fn stop_monitoring(&self) {
        let subscription = {
            let mut shared = lock(&self.shared);
            if shared.status != MonitorStatus::Monitoring {
                return;
            }
            shared.status = MonitorStatus::Idle;
            shared.subscription.take()
        };
        drop(subscription);

        tracing::info!("Geofence monitoring stopped");
    }
}

/// Observer tied to one `start_monitoring` session.
struct SessionObserver {
    shared: Weak<Mutex<MonitorShared>>,
    session: u64,
}

impl PositionObserver for SessionObserver {
    fn on_position(&self, position: Coordinate) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let mut shared = lock(&shared);
        if !shared.is_current(self.session) {
            return;
        }

        let MonitorShared { fences, handler, .. } = &mut *shared;
        for event in fences.update(position) {
            match event.transition {
                Transition::Enter => handler.on_enter(&event),
                Transition::Exit => handler.on_exit(&event),
            }
        }
    }

    fn on_error(&self, error: LocationError) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let subscription = {
            let mut shared = lock(&shared);
            if !shared.is_current(self.session) {
                return;
            }
            tracing::warn!(%error, "Geofence monitoring stopped by location failure");
            shared.status = MonitorStatus::Failed(error.clone());
            shared.handler.on_error(&error);
            shared.subscription.take()
        };
        drop(subscription);
    }

    fn on_retry(&self, error: &LocationError, attempt: u32, delay: Duration) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let mut shared = lock(&shared);
        if shared.is_current(self.session) {
            shared.handler.on_retry(error, attempt, delay);
        }
    }
}
