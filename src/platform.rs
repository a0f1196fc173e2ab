//! Device-side collaborators of the location pipeline.
//!
//! These traits are the seams between the pipeline and whatever the host
//! platform offers: a permission prompt, a positioning service and an
//! on-device reverse geocoder. The desktop implementations live in
//! [`crate::location`]; tests supply their own fakes.

use crate::error::PlatformError;
use crate::models::Coordinates;
use async_trait::async_trait;
use std::time::Duration;

/// Accuracy tier requested from the positioning service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    High,
    Balanced,
}

/// A previously recorded fix and how long ago it was taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastKnownPosition {
    pub coords: Coordinates,
    pub age: Duration,
}

/// Best-effort partial address from an on-device geocoder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DevicePlace {
    pub name: Option<String>,
    pub street: Option<String>,
    pub street_number: Option<String>,
    pub district: Option<String>,
    pub subregion: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub iso_country_code: Option<String>,
    pub postal_code: Option<String>,
}

#[async_trait]
pub trait PermissionService: Send + Sync {
    /// Whether location access is already granted.
    async fn check(&self) -> Result<bool, PlatformError>;

    /// Ask for location access. Returns the answer.
    async fn request(&self) -> Result<bool, PlatformError>;
}

#[async_trait]
pub trait PositionService: Send + Sync {
    async fn last_known(&self) -> Result<Option<LastKnownPosition>, PlatformError>;

    async fn current_position(&self, accuracy: Accuracy) -> Result<Coordinates, PlatformError>;
}

#[async_trait]
pub trait DeviceGeocoder: Send + Sync {
    async fn reverse_geocode(
        &self,
        coords: Coordinates,
    ) -> Result<Option<DevicePlace>, PlatformError>;
}
