//! Host-driven location source.

use super::{lock, LocationError, LocationSource, PositionObserver, PositionProvider, Subscription};
use crate::Coordinate;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct PushState {
    observers: Vec<(u64, Arc<dyn PositionObserver>)>,
    next_id: u64,
    last_position: Option<Coordinate>,
    last_error: Option<LocationError>,
}

/// A location source fed by the host application.
///
/// Wire the platform's watch callbacks to [`publish`](Self::publish) and
/// [`fail`](Self::fail). Clones share the same subscribers. Observers are
/// called outside the internal lock, so they may subscribe or unsubscribe
/// from inside a callback.
#[derive(Clone, Default)]
pub struct PushLocationSource {
    state: Arc<Mutex<PushState>>,
}

impl PushLocationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a position sample to every subscriber.
    pub fn publish(&self, position: Coordinate) {
        let observers = {
            let mut state = lock(&self.state);
            state.last_position = Some(position);
            state.last_error = None;
            snapshot(&state)
        };
        for observer in observers {
            observer.on_position(position);
        }
    }

    /// Delivers a failure to every subscriber.
    pub fn fail(&self, error: LocationError) {
        let observers = {
            let mut state = lock(&self.state);
            state.last_error = Some(error.clone());
            snapshot(&state)
        };
        for observer in observers {
            observer.on_error(error.clone());
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).observers.len()
    }

    /// The last published position, if any.
    pub fn last_position(&self) -> Option<Coordinate> {
        lock(&self.state).last_position
    }
}

fn snapshot(state: &PushState) -> Vec<Arc<dyn PositionObserver>> {
    state.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
}

impl LocationSource for PushLocationSource {
    fn subscribe(&self, observer: Arc<dyn PositionObserver>) -> Subscription {
        let id = {
            let mut state = lock(&self.state);
            let id = state.next_id;
            state.next_id += 1;
            state.observers.push((id, observer));
            id
        };

        let state = Arc::clone(&self.state);
        Subscription::new(move || {
            lock(&state).observers.retain(|(other, _)| *other != id);
        })
    }
}

impl PositionProvider for PushLocationSource {
    /// Returns the last fix unless a failure was reported after it.
    fn current_position(&self) -> Result<Coordinate, LocationError> {
        let state = lock(&self.state);
        match (&state.last_error, state.last_position) {
            (Some(err), _) => Err(err.clone()),
            (None, Some(position)) => Ok(position),
            (None, None) => Err(LocationError::position_unavailable()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        positions: Mutex<Vec<Coordinate>>,
        errors: Mutex<Vec<LocationError>>,
    }

    impl PositionObserver for Recorder {
        fn on_position(&self, position: Coordinate) {
            lock(&self.positions).push(position);
        }

        fn on_error(&self, error: LocationError) {
            lock(&self.errors).push(error);
        }
    }

    #[test]
    fn test_publish_reaches_subscribers() {
        let source = PushLocationSource::new();
        let recorder = Arc::new(Recorder::default());

        let _sub = source.subscribe(recorder.clone());
        source.publish(Coordinate::new(1.0, 2.0));
        source.fail(LocationError::timeout());

        assert_eq!(*lock(&recorder.positions), vec![Coordinate::new(1.0, 2.0)]);
        assert_eq!(*lock(&recorder.errors), vec![LocationError::timeout()]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let source = PushLocationSource::new();
        let recorder = Arc::new(Recorder::default());

        let sub = source.subscribe(recorder.clone());
        assert_eq!(source.subscriber_count(), 1);
        sub.unsubscribe();
        assert_eq!(source.subscriber_count(), 0);

        source.publish(Coordinate::new(1.0, 2.0));
        assert!(lock(&recorder.positions).is_empty());
    }

    #[test]
    fn test_clones_share_subscribers() {
        let source = PushLocationSource::new();
        let recorder = Arc::new(Recorder::default());
        let _sub = source.subscribe(recorder.clone());

        source.clone().publish(Coordinate::new(3.0, 4.0));
        assert_eq!(lock(&recorder.positions).len(), 1);
    }

    #[test]
    fn test_current_position() {
        let source = PushLocationSource::new();
        assert_eq!(source.current_position(), Err(LocationError::position_unavailable()));

        source.publish(Coordinate::new(19.43, -99.13));
        assert_eq!(source.current_position(), Ok(Coordinate::new(19.43, -99.13)));
        assert_eq!(source.last_position(), Some(Coordinate::new(19.43, -99.13)));

        source.fail(LocationError::PermissionDenied);
        assert_eq!(source.current_position(), Err(LocationError::PermissionDenied));
    }
}
