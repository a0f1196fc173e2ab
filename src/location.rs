//! Desktop implementations of the device collaborators.
//!
//! A desktop has no GPS receiver or permission dialog, so this module stands
//! in for them:
//!
//! * [`IpLocator`] resolves position through IP geolocation. The accuracy tier
//!   picks the provider, so the balanced retry goes to a different service.
//!   Every fix is written to the [`PositionCache`] and served back as the
//!   "last known" position, and the place names the provider reported with it
//!   back the on-device reverse geocoder.
//! * [`StoredPermission`] keeps the user's answer in the same cache and uses
//!   the configured policy as the answer to a permission request.

use crate::config::{IpService, PositioningConfig};
use crate::db::{PositionCache, StoredFix};
use crate::error::PlatformError;
use crate::models::Coordinates;
use crate::platform::{
    Accuracy, DeviceGeocoder, DevicePlace, LastKnownPosition, PermissionService, PositionService,
};
use async_trait::async_trait;
use chrono::Utc;
use ipgeolocate::{Locator, Service};
use std::sync::Arc;
use tracing::{debug, info, warn};

impl IpService {
    fn service(self) -> Service {
        match self {
            IpService::IpApi => Service::IpApi,
            IpService::IpApiCo => Service::IpApiCo,
            IpService::IpWhois => Service::IpWhois,
            IpService::FreeGeoIp => Service::FreeGeoIp,
        }
    }
}

pub struct IpLocator {
    cache: Arc<PositionCache>,
    config: PositioningConfig,
}

impl IpLocator {
    pub fn new(cache: Arc<PositionCache>, config: PositioningConfig) -> Self {
        Self { cache, config }
    }

    fn service_for(&self, accuracy: Accuracy) -> IpService {
        match accuracy {
            Accuracy::High => self.config.high_accuracy_service,
            Accuracy::Balanced => self.config.balanced_service,
        }
    }
}

fn parse_degrees(value: &str, what: &str) -> Result<f64, PlatformError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| {
            PlatformError::Unavailable(format!("provider returned invalid {what} {value:?}"))
        })
}

#[async_trait]
impl PositionService for IpLocator {
    async fn last_known(&self) -> Result<Option<LastKnownPosition>, PlatformError> {
        let Some(fix) = self.cache.last_fix()? else {
            return Ok(None);
        };

        // A fix stamped in the future (clock change) counts as brand new.
        let age = (Utc::now() - fix.recorded_at).to_std().unwrap_or_default();
        Ok(Some(LastKnownPosition {
            coords: fix.coords,
            age,
        }))
    }

    async fn current_position(&self, accuracy: Accuracy) -> Result<Coordinates, PlatformError> {
        let service = self.service_for(accuracy);
        debug!("Requesting {:?} fix from {:?}", accuracy, service);

        let loc = Locator::get(&self.config.lookup_ip, service.service())
            .await
            .map_err(|e| PlatformError::Unavailable(format!("{service:?}: {e}")))?;

        let coords = Coordinates::new(
            parse_degrees(&loc.latitude, "latitude")?,
            parse_degrees(&loc.longitude, "longitude")?,
        );
        info!("Geolocation successful - ({}) via {:?}", coords, service);

        let fix = StoredFix {
            coords,
            recorded_at: Utc::now(),
            city: loc.city,
            region: loc.region,
            country: loc.country,
        };
        if let Err(e) = self.cache.store_fix(&fix) {
            // The fix itself is still good; only the next fast path is lost.
            warn!("Could not cache position fix: {}", e);
        }

        Ok(coords)
    }
}

#[async_trait]
impl DeviceGeocoder for IpLocator {
    async fn reverse_geocode(
        &self,
        coords: Coordinates,
    ) -> Result<Option<DevicePlace>, PlatformError> {
        let Some(fix) = self.cache.last_fix()? else {
            return Ok(None);
        };

        let distance = fix.coords.distance_km(&coords);
        if distance > self.config.geocoder_radius_km {
            debug!(
                "Cached place is {:.1} km away, outside the {:.1} km radius",
                distance, self.config.geocoder_radius_km
            );
            return Ok(None);
        }

        let non_empty = |s: String| Some(s).filter(|s| !s.trim().is_empty());
        let place = DevicePlace {
            city: non_empty(fix.city),
            region: non_empty(fix.region),
            country: non_empty(fix.country),
            ..DevicePlace::default()
        };

        if place.city.is_none() && place.region.is_none() && place.country.is_none() {
            return Ok(None);
        }
        Ok(Some(place))
    }
}

pub struct StoredPermission {
    cache: Arc<PositionCache>,
    allow: bool,
}

impl StoredPermission {
    pub fn new(cache: Arc<PositionCache>, allow: bool) -> Self {
        Self { cache, allow }
    }
}

#[async_trait]
impl PermissionService for StoredPermission {
    async fn check(&self) -> Result<bool, PlatformError> {
        // Revoking in config overrides an earlier stored grant.
        if !self.allow {
            return Ok(false);
        }
        Ok(self.cache.permission()?.unwrap_or(false))
    }

    async fn request(&self) -> Result<bool, PlatformError> {
        self.cache.store_permission(self.allow)?;
        info!("Location permission {}", if self.allow { "granted" } else { "denied" });
        Ok(self.allow)
    }
}
