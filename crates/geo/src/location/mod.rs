//! Location sources.
//!
//! A [`LocationSource`] is anything that can push position samples to a
//! [`PositionObserver`] until the returned [`Subscription`] is cancelled. The
//! platform watch API (browser `watchPosition`, CoreLocation, ...) lives
//! behind this trait; [`PushLocationSource`] is the bridge a host calls into.
//!
//! Retry is layered on top with [`RetryingSource`] instead of being built
//! into each source.

mod push;
mod retry;
pub mod timer;

pub use push::PushLocationSource;
pub use retry::RetryingSource;
pub use timer::{ManualTimer, Timer, TimerHandle};

#[cfg(feature = "tokio")]
pub use timer::TokioTimer;

use crate::Coordinate;
use mallradar_core::ErrorCode;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Why a position could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnavailableReason {
    /// The device did not answer in time
    #[error("timed out")]
    Timeout,
    /// The device has no fix
    #[error("position unavailable")]
    PositionUnavailable,
    /// Platform-specific failure
    #[error("{0}")]
    Other(String),
}

/// Failures reported by a location source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The user refused location access. Terminal; never retried.
    #[error("location permission denied")]
    PermissionDenied,

    /// No position right now; may succeed on retry.
    #[error("location unavailable: {0}")]
    Unavailable(UnavailableReason),

    /// Retries were used up. Terminal.
    #[error("location unavailable after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Consecutive failed attempts
        attempts: u32,
        /// Reason reported by the last attempt
        last: UnavailableReason,
    },
}

/// Error code for integration with mallradar-core error handling.
/// Range: 11xxx for location errors.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationErrorCode {
    /// Permission denied
    PermissionDenied = 11001,
    /// Transient unavailability
    Unavailable = 11002,
    /// Retries exhausted
    RetriesExhausted = 11003,
}

impl LocationError {
    /// Shorthand for `Unavailable(Timeout)`.
    pub fn timeout() -> Self {
        Self::Unavailable(UnavailableReason::Timeout)
    }

    /// Shorthand for `Unavailable(PositionUnavailable)`.
    pub fn position_unavailable() -> Self {
        Self::Unavailable(UnavailableReason::PositionUnavailable)
    }

    /// True if waiting and re-subscribing might help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> LocationErrorCode {
        match self {
            Self::PermissionDenied => LocationErrorCode::PermissionDenied,
            Self::Unavailable(_) => LocationErrorCode::Unavailable,
            Self::RetriesExhausted { .. } => LocationErrorCode::RetriesExhausted,
        }
    }
}

impl From<LocationError> for mallradar_core::Error {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::PermissionDenied => mallradar_core::Error::location_permission_denied(),
            LocationError::Unavailable(_) => {
                mallradar_core::Error::new(ErrorCode::LocationUnavailable, err.to_string())
            }
            LocationError::RetriesExhausted { .. } => {
                mallradar_core::Error::new(ErrorCode::LocationRetriesExhausted, err.to_string())
                    .with_suggestion("Check that location services are enabled and try again")
            }
        }
    }
}

/// Receives samples and failures from a [`LocationSource`].
pub trait PositionObserver: Send + Sync {
    /// A new position sample.
    fn on_position(&self, position: Coordinate);

    /// The stream failed and will deliver nothing further.
    fn on_error(&self, error: LocationError);

    /// The stream failed transiently; a retry is scheduled after `delay`.
    fn on_retry(&self, _error: &LocationError, _attempt: u32, _delay: Duration) {}
}

/// A push-based position stream.
pub trait LocationSource: Send + Sync + 'static {
    /// Starts delivering samples to `observer` until the subscription is
    /// cancelled or dropped.
    fn subscribe(&self, observer: Arc<dyn PositionObserver>) -> Subscription;
}

impl<S: LocationSource> LocationSource for Arc<S> {
    fn subscribe(&self, observer: Arc<dyn PositionObserver>) -> Subscription {
        (**self).subscribe(observer)
    }
}

/// One-shot position lookup, for screens that only need the current fix.
pub trait PositionProvider {
    /// The most recent position, or why there is none.
    fn current_position(&self) -> Result<Coordinate, LocationError>;
}

/// Handle returned by [`LocationSource::subscribe`].
///
/// Cancelling is synchronous: once [`Subscription::unsubscribe`] returns (or
/// the handle is dropped) the source has released the observer.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wraps a cancellation callback.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to release.
    pub fn empty() -> Self {
        Self { cancel: None }
    }

    /// Cancels the subscription.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Locks a mutex, recovering the data if a panicking thread poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_retryable_classification() {
        assert!(LocationError::timeout().is_retryable());
        assert!(LocationError::position_unavailable().is_retryable());
        assert!(!LocationError::PermissionDenied.is_retryable());
        assert!(!LocationError::RetriesExhausted {
            attempts: 3,
            last: UnavailableReason::Timeout
        }
        .is_retryable());
    }

    #[test]
    fn test_error_display_and_codes() {
        let err = LocationError::RetriesExhausted {
            attempts: 3,
            last: UnavailableReason::Timeout,
        };
        assert_eq!(err.to_string(), "location unavailable after 3 attempts: timed out");
        assert_eq!(err.code() as u32, 11003);
    }

    #[test]
    fn test_permission_denied_maps_to_core_code() {
        let core: mallradar_core::Error = LocationError::PermissionDenied.into();
        assert_eq!(core.code, ErrorCode::LocationPermissionDenied);
        assert!(core.suggestion.is_some());
    }

    #[test]
    fn test_subscription_cancels_once() {
        let count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&count);
        let sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        sub.unsubscribe();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let counter = Arc::clone(&count);
        drop(Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(count.load(Ordering::SeqCst), 2);

        drop(Subscription::empty());
    }
}
