//! Coordinate acquisition: cached fix first, then a fresh one.
//!
//! A cached position younger than the freshness threshold is returned as-is
//! without touching the positioning hardware. Otherwise a high-accuracy fix is
//! requested, and if that fails for any reason a single balanced-accuracy
//! request is made before giving up. A cached fix is never upgraded later; a
//! better fix only arrives with the next refresh.
//!
//! Permission is the caller's job. The acquirer does not check it, but a
//! platform that refuses for lack of permission surfaces as
//! [`LocationError::PermissionDenied`].

use crate::error::{LocationError, PlatformError};
use crate::models::Coordinates;
use crate::platform::{Accuracy, PositionService};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct CoordinateAcquirer {
    positions: Arc<dyn PositionService>,
    freshness: Duration,
    timeout: Duration,
}

impl CoordinateAcquirer {
    pub fn new(
        positions: Arc<dyn PositionService>,
        freshness: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            positions,
            freshness,
            timeout,
        }
    }

    pub async fn acquire_coordinates(&self) -> Result<Coordinates, LocationError> {
        match self.bounded(self.positions.last_known()).await {
            Ok(Some(last)) if last.age < self.freshness => {
                debug!("Using cached fix ({}), {:?} old", last.coords, last.age);
                return Ok(last.coords);
            }
            Ok(Some(last)) => debug!("Cached fix is stale ({:?} old)", last.age),
            Ok(None) => debug!("No cached fix available"),
            Err(e) => warn!("Could not read cached fix: {}", e),
        }

        match self.bounded(self.positions.current_position(Accuracy::High)).await {
            Ok(coords) => Ok(coords),
            Err(e) => {
                info!("High accuracy fix failed ({}), retrying with balanced accuracy", e);
                let coords = self
                    .bounded(self.positions.current_position(Accuracy::Balanced))
                    .await?;
                Ok(coords)
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, PlatformError>>,
    ) -> Result<T, PlatformError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| PlatformError::Timeout(self.timeout))?
    }
}
