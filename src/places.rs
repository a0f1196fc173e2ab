use crate::api::MapsApi;
use crate::error::{ApiError, LocationError};
use crate::models::{AddressComponents, Coordinates, LocationData, PlacePrediction};
use crate::resolver::apply_components;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Place autocomplete and details lookup.
///
/// Search never fails: provider errors, non-`OK` statuses and timeouts all
/// come back as an empty prediction list. Detail resolution does fail, with
/// [`LocationError::Details`] (or [`LocationError::Config`] when no API key is
/// configured).
pub struct PlaceSearchClient {
    maps: Arc<dyn MapsApi>,
    min_query_len: usize,
    timeout: Duration,
}

impl PlaceSearchClient {
    pub fn new(maps: Arc<dyn MapsApi>, min_query_len: usize, timeout: Duration) -> Self {
        Self {
            maps,
            min_query_len,
            timeout,
        }
    }

    /// Whether `query` is long enough to be sent to the provider.
    pub fn is_searchable(&self, query: &str) -> bool {
        query.chars().count() >= self.min_query_len
    }

    pub async fn search_places(
        &self,
        query: &str,
        bias: Option<Coordinates>,
    ) -> Vec<PlacePrediction> {
        if !self.is_searchable(query) {
            return Vec::new();
        }

        let request = self.maps.autocomplete(query, bias);
        let response = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(ApiError::MissingApiKey)) => {
                error!("Place search unavailable: {}", ApiError::MissingApiKey);
                return Vec::new();
            }
            Ok(Err(e)) => {
                warn!("Place search error: {}", e);
                return Vec::new();
            }
            Err(_) => {
                warn!("Place search timed out after {:?}", self.timeout);
                return Vec::new();
            }
        };

        if response.status != "OK" {
            // ZERO_RESULTS is the common case here and not worth a warning.
            debug!("Place search for {:?} returned {}", query, response.status);
            return Vec::new();
        }

        response.predictions
    }

    pub async fn resolve_prediction(
        &self,
        prediction: &PlacePrediction,
    ) -> Result<LocationData, LocationError> {
        let response = tokio::time::timeout(
            self.timeout,
            self.maps.place_details(&prediction.place_id),
        )
        .await
        .map_err(|_| LocationError::Details(format!("timed out after {:?}", self.timeout)))?
        .map_err(|e| match e {
            ApiError::MissingApiKey => LocationError::Config(e.to_string()),
            other => LocationError::Details(other.to_string()),
        })?;

        if response.status != "OK" {
            return Err(LocationError::Details(
                response
                    .error_message
                    .unwrap_or_else(|| format!("status {}", response.status)),
            ));
        }

        let details = response
            .result
            .ok_or_else(|| LocationError::Details("response has no result".to_string()))?;
        let location = details
            .geometry
            .ok_or_else(|| LocationError::Details("place has no coordinates".to_string()))?
            .location;

        let formatting = &prediction.structured_formatting;
        let mut address = AddressComponents::default();
        apply_components(&mut address, &details.address_components);

        address.place_id = prediction.place_id.clone();
        address.formatted_address = details.formatted_address;
        address.primary_text = formatting.main_text.clone();
        address.secondary_text = formatting.secondary_text.clone();
        if !details.name.is_empty() {
            address.building_name = details.name;
        }
        if address.area.is_empty() {
            address.area = formatting
                .secondary_text
                .split(',')
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
        }
        if address.primary_text.is_empty() {
            address.primary_text = if address.building_name.is_empty() {
                prediction.description.clone()
            } else {
                address.building_name.clone()
            };
        }

        Ok(LocationData::new(
            Coordinates::new(location.lat, location.lng),
            address,
        ))
    }
}
