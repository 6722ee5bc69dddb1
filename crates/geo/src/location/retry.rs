//! Bounded-retry decorator for location sources.

use super::timer::{Timer, TimerHandle};
use super::{lock, LocationError, LocationSource, PositionObserver, Subscription};
use crate::Coordinate;
use mallradar_core::retry::RetryConfig;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// Wraps a source and re-subscribes after transient failures.
///
/// - `Unavailable` errors drop the inner subscription, notify
///   [`PositionObserver::on_retry`], and re-subscribe after
///   [`RetryConfig::delay_for_attempt`].
/// - A delivered position resets the failure count.
/// - After `max_attempts` consecutive failures the observer receives
///   [`LocationError::RetriesExhausted`] through `on_error`.
/// - `PermissionDenied` is forwarded at once and never retried.
///
/// Cancelling the returned subscription cancels the inner subscription and
/// any pending retry before it returns.
pub struct RetryingSource<S, T> {
    inner: Arc<S>,
    timer: Arc<T>,
    config: RetryConfig,
}

impl<S: LocationSource, T: Timer> RetryingSource<S, T> {
    pub fn new(inner: S, timer: T, config: RetryConfig) -> Self {
        Self {
            inner: Arc::new(inner),
            timer: Arc::new(timer),
            config,
        }
    }

    /// The wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: LocationSource, T: Timer> LocationSource for RetryingSource<S, T> {
    fn subscribe(&self, observer: Arc<dyn PositionObserver>) -> Subscription {
        let session = Arc::new(RetrySession {
            inner: Arc::clone(&self.inner),
            timer: Arc::clone(&self.timer),
            config: self.config.clone(),
            downstream: observer,
            state: Mutex::new(RetryState::default()),
        });

        RetrySession::connect(&session);
        Subscription::new(move || session.cancel())
    }
}

#[derive(Default)]
struct RetryState {
    failures: u32,
    generation: u64,
    cancelled: bool,
    inner_subscription: Option<Subscription>,
    pending_retry: Option<TimerHandle>,
}

struct RetrySession<S, T> {
    inner: Arc<S>,
    timer: Arc<T>,
    config: RetryConfig,
    downstream: Arc<dyn PositionObserver>,
    state: Mutex<RetryState>,
}

/// What to tell the downstream observer after handling an inner failure.
enum Outcome {
    Retry { attempt: u32, delay: Duration },
    GiveUp(LocationError),
}

impl<S: LocationSource, T: Timer> RetrySession<S, T> {
    /// Opens a fresh inner subscription, replacing any previous one.
    fn connect(session: &Arc<Self>) {
        let generation = {
            let mut state = lock(&session.state);
            if state.cancelled {
                return;
            }
            state.pending_retry = None;
            state.generation += 1;
            state.generation
        };

        let observer = Arc::new(AttemptObserver {
            session: Arc::downgrade(session),
            generation,
        });
        let subscription = session.inner.subscribe(observer);

        // Whatever we displace is released after the lock is dropped.
        let _released = {
            let mut state = lock(&session.state);
            if state.cancelled || state.generation != generation {
                Some(subscription)
            } else {
                state.inner_subscription.replace(subscription)
            }
        };
    }

    fn cancel(&self) {
        let (subscription, pending) = {
            let mut state = lock(&self.state);
            state.cancelled = true;
            (state.inner_subscription.take(), state.pending_retry.take())
        };
        drop(pending);
        drop(subscription);
    }

    fn handle_position(&self, generation: u64, position: Coordinate) {
        {
            let mut state = lock(&self.state);
            if state.cancelled || state.generation != generation {
                return;
            }
            state.failures = 0;
        }
        self.downstream.on_position(position);
    }

    fn handle_error(session: &Arc<Self>, generation: u64, error: LocationError) {
        let (outcome, released) = {
            let mut state = lock(&session.state);
            if state.cancelled || state.generation != generation {
                return;
            }
            // The failed stream is finished; late callbacks from it are stale.
            state.generation += 1;
            let released = state.inner_subscription.take();

            let outcome = match &error {
                LocationError::Unavailable(reason) => {
                    state.failures += 1;
                    if session.config.is_exhausted(state.failures) {
                        state.cancelled = true;
                        Outcome::GiveUp(LocationError::RetriesExhausted {
                            attempts: state.failures,
                            last: reason.clone(),
                        })
                    } else {
                        let attempt = state.failures;
                        let delay = session.config.delay_for_attempt(attempt);
                        let weak = Arc::downgrade(session);
                        state.pending_retry = Some(session.timer.schedule(
                            delay,
                            Box::new(move || {
                                if let Some(session) = weak.upgrade() {
                                    RetrySession::connect(&session);
                                }
                            }),
                        ));
                        Outcome::Retry { attempt, delay }
                    }
                }
                _ => {
                    state.cancelled = true;
                    Outcome::GiveUp(error.clone())
                }
            };
            (outcome, released)
        };
        drop(released);

        match outcome {
            Outcome::Retry { attempt, delay } => {
                tracing::debug!(%error, attempt, ?delay, "Location retry scheduled");
                session.downstream.on_retry(&error, attempt, delay);
            }
            Outcome::GiveUp(terminal) => {
                tracing::warn!(error = %terminal, "Location stream failed");
                session.downstream.on_error(terminal);
            }
        }
    }
}

/// Observer handed to the inner source for one connection attempt.
struct AttemptObserver<S, T> {
    session: Weak<RetrySession<S, T>>,
    generation: u64,
}

impl<S: LocationSource, T: Timer> PositionObserver for AttemptObserver<S, T> {
    fn on_position(&self, position: Coordinate) {
        if let Some(session) = self.session.upgrade() {
            session.handle_position(self.generation, position);
        }
    }

    fn on_error(&self, error: LocationError) {
        if let Some(session) = self.session.upgrade() {
            RetrySession::handle_error(&session, self.generation, error);
        }
    }

    fn on_retry(&self, error: &LocationError, attempt: u32, delay: Duration) {
        // A nested retrying source; pass its progress through.
        if let Some(session) = self.session.upgrade() {
            session.downstream.on_retry(error, attempt, delay);
        }
    }
}
