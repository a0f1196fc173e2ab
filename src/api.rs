use crate::config::MapsConfig;
use crate::error::ApiError;
use crate::models::{AutocompleteResponse, Coordinates, GeocodeResponse, PlaceDetailsResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

const DETAIL_FIELDS: &str = "formatted_address,geometry,address_components,name";

/// The mapping provider's HTTP endpoints. Implementations return the decoded
/// response as-is; interpreting `status` is up to the caller.
#[async_trait]
pub trait MapsApi: Send + Sync {
    async fn reverse_geocode(&self, coords: Coordinates) -> Result<GeocodeResponse, ApiError>;

    async fn autocomplete(
        &self,
        query: &str,
        bias: Option<Coordinates>,
    ) -> Result<AutocompleteResponse, ApiError>;

    async fn place_details(&self, place_id: &str) -> Result<PlaceDetailsResponse, ApiError>;
}

pub struct GoogleMapsClient {
    client: Client,
    api_key: Option<String>,
    config: MapsConfig,
}

impl GoogleMapsClient {
    pub fn new(config: MapsConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            api_key: config.resolve_api_key(),
            config,
        })
    }

    fn key(&self) -> Result<&str, ApiError> {
        self.api_key.as_deref().ok_or(ApiError::MissingApiKey)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        debug!("GET {}", url);

        let res = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.timeout_or_http(e))?
            .json::<T>()
            .await
            .map_err(|e| self.timeout_or_http(e))?;

        Ok(res)
    }

    fn timeout_or_http(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.config.request_timeout())
        } else {
            ApiError::Http(e)
        }
    }
}

fn latlng(coords: Coordinates) -> String {
    format!("{},{}", coords.latitude, coords.longitude)
}

#[async_trait]
impl MapsApi for GoogleMapsClient {
    async fn reverse_geocode(&self, coords: Coordinates) -> Result<GeocodeResponse, ApiError> {
        let key = self.key()?;
        self.get_json(
            &self.config.geocode_url,
            &[("latlng", latlng(coords)), ("key", key.to_string())],
        )
        .await
    }

    async fn autocomplete(
        &self,
        query: &str,
        bias: Option<Coordinates>,
    ) -> Result<AutocompleteResponse, ApiError> {
        let key = self.key()?;
        let mut params = vec![("input", query.to_string()), ("key", key.to_string())];
        if let Some(coords) = bias {
            params.push(("location", latlng(coords)));
            params.push(("radius", self.config.bias_radius_m.to_string()));
        }
        params.push(("components", format!("country:{}", self.config.country)));

        self.get_json(&self.config.autocomplete_url, &params).await
    }

    async fn place_details(&self, place_id: &str) -> Result<PlaceDetailsResponse, ApiError> {
        let key = self.key()?;
        self.get_json(
            &self.config.details_url,
            &[
                ("place_id", place_id.to_string()),
                ("fields", DETAIL_FIELDS.to_string()),
                ("key", key.to_string()),
            ],
        )
        .await
    }
}
