//! Retry backoff driven by the tokio runtime clock.

use mallradar_core::retry::RetryConfig;
use mallradar_geo::location::TokioTimer;
use mallradar_geo::{
    Coordinate, LocationError, LocationSource, PositionObserver, PushLocationSource, RetryingSource,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Counter {
    positions: Mutex<usize>,
    retries: Mutex<usize>,
}

impl PositionObserver for Counter {
    fn on_position(&self, _position: Coordinate) {
        *self.positions.lock().unwrap() += 1;
    }

    fn on_error(&self, error: LocationError) {
        panic!("unexpected terminal error: {error}");
    }

    fn on_retry(&self, _error: &LocationError, _attempt: u32, _delay: Duration) {
        *self.retries.lock().unwrap() += 1;
    }
}

fn config() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(30),
        backoff_multiplier: 2.0,
        jitter: false,
    }
}

#[tokio::test(start_paused = true)]
async fn reconnects_after_backoff_elapses() {
    let push = PushLocationSource::new();
    let timer = TokioTimer::try_current().unwrap();
    let source = RetryingSource::new(push.clone(), timer, config());
    let counter = Arc::new(Counter::default());
    let _sub = source.subscribe(counter.clone());

    push.fail(LocationError::timeout());
    assert_eq!(*counter.retries.lock().unwrap(), 1);
    assert_eq!(push.subscriber_count(), 0);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(push.subscriber_count(), 0);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(push.subscriber_count(), 1);

    push.publish(Coordinate::new(19.4326, -99.1332));
    assert_eq!(*counter.positions.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelling_aborts_pending_reconnect() {
    let push = PushLocationSource::new();
    let timer = TokioTimer::try_current().unwrap();
    let source = RetryingSource::new(push.clone(), timer, config());
    let sub = source.subscribe(Arc::new(Counter::default()));

    push.fail(LocationError::timeout());
    sub.unsubscribe();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(push.subscriber_count(), 0);
}
