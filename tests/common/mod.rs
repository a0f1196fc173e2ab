//! In-process fakes for every collaborator of the location pipeline.
#![allow(dead_code)]

use async_trait::async_trait;
use physio_locator::acquirer::CoordinateAcquirer;
use physio_locator::api::MapsApi;
use physio_locator::error::{ApiError, PlatformError};
use physio_locator::models::{
    AutocompleteResponse, Coordinates, GeocodeResponse, PlaceDetailsResponse,
};
use physio_locator::picker::LocationPicker;
use physio_locator::places::PlaceSearchClient;
use physio_locator::platform::{
    Accuracy, DeviceGeocoder, DevicePlace, LastKnownPosition, PermissionService, PositionService,
};
use physio_locator::resolver::AddressResolver;
use physio_locator::state::{LocationPipeline, LocationStateMachine};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const MUMBAI: Coordinates = Coordinates {
    latitude: 19.0760,
    longitude: 72.8777,
};

pub const PUNE: Coordinates = Coordinates {
    latitude: 18.5204,
    longitude: 73.8567,
};

pub const TIMEOUT: Duration = Duration::from_secs(12);

pub fn vashi_geocode() -> Value {
    json!({
        "status": "OK",
        "results": [{
            "formatted_address": "Vashi, Navi Mumbai, Maharashtra 400703, India",
            "address_components": [
                { "types": ["sublocality"], "short_name": "Vashi" },
                { "types": ["locality"], "short_name": "Navi Mumbai" },
                { "types": ["postal_code"], "short_name": "400703" }
            ]
        }]
    })
}

pub struct FakePermissions {
    pub check: Result<bool, ()>,
    pub request: Result<bool, ()>,
    pub requests: AtomicUsize,
}

impl FakePermissions {
    pub fn new(check: Result<bool, ()>, request: Result<bool, ()>) -> Arc<Self> {
        Arc::new(Self {
            check,
            request,
            requests: AtomicUsize::new(0),
        })
    }

    pub fn granted() -> Arc<Self> {
        Self::new(Ok(true), Ok(true))
    }
}

#[async_trait]
impl PermissionService for FakePermissions {
    async fn check(&self) -> Result<bool, PlatformError> {
        self.check
            .map_err(|_| PlatformError::Unavailable("check failed".to_string()))
    }

    async fn request(&self) -> Result<bool, PlatformError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.request
            .map_err(|_| PlatformError::Unavailable("request failed".to_string()))
    }
}

/// One scripted answer to `current_position`.
pub struct Fix {
    pub delay: Duration,
    pub coords: Option<Coordinates>,
}

pub struct FakePositions {
    pub last: Option<LastKnownPosition>,
    pub script: Mutex<VecDeque<Fix>>,
    /// Answer once the script runs out. `None` means "no fix".
    pub default: Option<Coordinates>,
    pub calls: Mutex<Vec<Accuracy>>,
}

impl FakePositions {
    pub fn answering(coords: Option<Coordinates>) -> Arc<Self> {
        Self::scripted(Vec::new(), coords)
    }

    pub fn scripted(script: Vec<Fix>, default: Option<Coordinates>) -> Arc<Self> {
        Arc::new(Self {
            last: None,
            script: Mutex::new(script.into()),
            default,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PositionService for FakePositions {
    async fn last_known(&self) -> Result<Option<LastKnownPosition>, PlatformError> {
        Ok(self.last)
    }

    async fn current_position(&self, accuracy: Accuracy) -> Result<Coordinates, PlatformError> {
        self.calls.lock().unwrap().push(accuracy);
        let next = self.script.lock().unwrap().pop_front();
        let (delay, coords) = match next {
            Some(fix) => (fix.delay, fix.coords),
            None => (Duration::ZERO, self.default),
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        coords.ok_or_else(|| PlatformError::Unavailable("no satellites".to_string()))
    }
}

pub struct FakeDevice {
    pub place: Option<DevicePlace>,
    pub calls: AtomicUsize,
}

impl FakeDevice {
    pub fn new(place: Option<DevicePlace>) -> Arc<Self> {
        Arc::new(Self {
            place,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl DeviceGeocoder for FakeDevice {
    async fn reverse_geocode(
        &self,
        _coords: Coordinates,
    ) -> Result<Option<DevicePlace>, PlatformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.place.clone())
    }
}

pub struct FakeMaps {
    pub geocode: Mutex<Value>,
    pub geocode_delay: Duration,
    pub autocomplete_status: Mutex<String>,
    pub autocomplete_delays: Mutex<HashMap<String, Duration>>,
    pub autocomplete_calls: Mutex<Vec<(String, Option<Coordinates>, Instant)>>,
    pub details: Mutex<Value>,
    pub details_delay: Duration,
    pub details_calls: AtomicUsize,
}

impl Default for FakeMaps {
    fn default() -> Self {
        Self {
            geocode: Mutex::new(vashi_geocode()),
            geocode_delay: Duration::ZERO,
            autocomplete_status: Mutex::new("OK".to_string()),
            autocomplete_delays: Mutex::new(HashMap::new()),
            autocomplete_calls: Mutex::new(Vec::new()),
            details: Mutex::new(json!({
                "status": "OK",
                "result": {
                    "name": "Vashi",
                    "formatted_address": "Vashi, Navi Mumbai, Maharashtra 400703, India",
                    "geometry": { "location": { "lat": 19.0771, "lng": 72.9986 } }
                }
            })),
            details_delay: Duration::ZERO,
            details_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeMaps {
    pub fn queries(&self) -> Vec<String> {
        self.autocomplete_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(q, _, _)| q.clone())
            .collect()
    }
}

#[async_trait]
impl MapsApi for FakeMaps {
    async fn reverse_geocode(&self, _coords: Coordinates) -> Result<GeocodeResponse, ApiError> {
        if !self.geocode_delay.is_zero() {
            tokio::time::sleep(self.geocode_delay).await;
        }
        let value = self.geocode.lock().unwrap().clone();
        Ok(serde_json::from_value(value).unwrap())
    }

    async fn autocomplete(
        &self,
        query: &str,
        bias: Option<Coordinates>,
    ) -> Result<AutocompleteResponse, ApiError> {
        self.autocomplete_calls
            .lock()
            .unwrap()
            .push((query.to_string(), bias, Instant::now()));

        let delay = self.autocomplete_delays.lock().unwrap().get(query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let status = self.autocomplete_status.lock().unwrap().clone();
        Ok(serde_json::from_value(json!({
            "status": status,
            "predictions": [{
                "place_id": format!("place-{query}"),
                "description": format!("{query}, Maharashtra, India"),
                "structured_formatting": {
                    "main_text": query,
                    "secondary_text": "Maharashtra, India"
                }
            }]
        }))
        .unwrap())
    }

    async fn place_details(&self, _place_id: &str) -> Result<PlaceDetailsResponse, ApiError> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        if !self.details_delay.is_zero() {
            tokio::time::sleep(self.details_delay).await;
        }
        let value = self.details.lock().unwrap().clone();
        Ok(serde_json::from_value(value).unwrap())
    }
}

pub struct Harness {
    pub permissions: Arc<FakePermissions>,
    pub positions: Arc<FakePositions>,
    pub device: Arc<FakeDevice>,
    pub maps: Arc<FakeMaps>,
}

impl Harness {
    pub fn new(positions: Arc<FakePositions>) -> Self {
        Self {
            permissions: FakePermissions::granted(),
            positions,
            device: FakeDevice::new(None),
            maps: Arc::new(FakeMaps::default()),
        }
    }

    pub fn pipeline(&self) -> LocationPipeline {
        LocationPipeline {
            permissions: self.permissions.clone(),
            acquirer: CoordinateAcquirer::new(
                self.positions.clone(),
                Duration::from_secs(300),
                TIMEOUT,
            ),
            resolver: AddressResolver::new(self.maps.clone(), self.device.clone(), TIMEOUT),
        }
    }

    pub fn machine(&self) -> LocationStateMachine {
        LocationStateMachine::new(self.pipeline())
    }

    pub fn picker(&self, machine: &LocationStateMachine) -> LocationPicker {
        let places = PlaceSearchClient::new(self.maps.clone(), 2, TIMEOUT);
        LocationPicker::new(places, machine.clone(), Duration::from_millis(300))
    }
}
