//! Error types for the location pipeline.
//!
//! [`LocationError`] is what callers of the pipeline see. [`ApiError`] and
//! [`PlatformError`] are produced by the external collaborators and are
//! converted at the component boundary (acquirer, resolver, place search).

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location permission is required")]
    PermissionDenied,

    #[error("Unable to get your position: {0}")]
    Position(String),

    #[error("Unable to fetch address: {0}")]
    Resolution(String),

    #[error("Unable to load place details: {0}")]
    Details(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("A place is already being selected")]
    SelectionInProgress,
}

/// Failures talking to the mapping provider over HTTP.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("maps API key is not configured (set maps.api_key or GOOGLE_MAPS_API_KEY)")]
    MissingApiKey,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Failures from the device side: permission store, positioning, geocoding.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("location permission not granted")]
    PermissionDenied,

    #[error("location services unavailable: {0}")]
    Unavailable(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Cache(#[from] rusqlite::Error),
}

impl From<PlatformError> for LocationError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::PermissionDenied => LocationError::PermissionDenied,
            other => LocationError::Position(other.to_string()),
        }
    }
}
