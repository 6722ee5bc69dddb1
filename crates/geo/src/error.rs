//! Error types for the geo crate.

use mallradar_core::ErrorCode;
use thiserror::Error;

/// Result type alias for geo operations.
pub type Result<T> = std::result::Result<T, GeoError>;

/// Errors that can occur during geo operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Invalid coordinate values
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Radius that is not a positive finite number
    #[error("Invalid radius: {0}")]
    InvalidRadius(f64),

    /// Result limit of zero
    #[error("Invalid result limit: {0}")]
    InvalidLimit(usize),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Error code for integration with mallradar-core error handling.
/// Range: 10xxx for geo errors.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoErrorCode {
    /// Invalid coordinate values
    InvalidCoordinate = 10001,
    /// Invalid radius
    InvalidRadius = 10002,
    /// JSON parsing error
    JsonParsing = 10003,
    /// Invalid result limit
    InvalidLimit = 10004,
}

impl GeoError {
    /// Returns the error code for this error.
    pub fn code(&self) -> GeoErrorCode {
        match self {
            GeoError::InvalidCoordinate(_) => GeoErrorCode::InvalidCoordinate,
            GeoError::InvalidRadius(_) => GeoErrorCode::InvalidRadius,
            GeoError::JsonError(_) => GeoErrorCode::JsonParsing,
            GeoError::InvalidLimit(_) => GeoErrorCode::InvalidLimit,
        }
    }
}

impl From<GeoError> for mallradar_core::Error {
    fn from(err: GeoError) -> Self {
        let code = match err.code() {
            GeoErrorCode::InvalidCoordinate => ErrorCode::InvalidCoordinate,
            GeoErrorCode::InvalidRadius => ErrorCode::InvalidRadius,
            GeoErrorCode::JsonParsing | GeoErrorCode::InvalidLimit => ErrorCode::InvalidInput,
        };
        mallradar_core::Error::new(code, err.to_string()).with_source(err)
    }
}
