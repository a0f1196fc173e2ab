//! Reverse geocoding with a provider waterfall.
//!
//! The mapping provider's geocoder is tried first because it knows about
//! buildings, flats and place IDs. When it fails in any way (transport error,
//! timeout, missing key, non-`OK` status or no results) the on-device
//! geocoder is asked instead. Only when both come up empty does resolution
//! fail with [`LocationError::Resolution`].

use crate::api::MapsApi;
use crate::error::{LocationError, PlatformError};
use crate::models::{AddressComponent, AddressComponents, Coordinates, GeocodeResult};
use crate::platform::{DeviceGeocoder, DevicePlace};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

// Accepted provider type tags per address field. The first component carrying
// any of the listed tags wins.
const BUILDING_TYPES: &[&str] = &["premise", "establishment"];
const FLAT_TYPES: &[&str] = &["subpremise"];
const STREET_NUMBER_TYPES: &[&str] = &["street_number"];
const STREET_TYPES: &[&str] = &["route"];
const AREA_TYPES: &[&str] = &["sublocality_level_1", "sublocality", "neighborhood"];
const LANDMARK_TYPES: &[&str] = &["point_of_interest", "establishment"];
const CITY_TYPES: &[&str] = &["locality", "administrative_area_level_2"];
const STATE_TYPES: &[&str] = &["administrative_area_level_1"];
const COUNTRY_TYPES: &[&str] = &["country"];
const POSTAL_CODE_TYPES: &[&str] = &["postal_code"];

/// Result types whose formatted address starts with a usable place name.
const NAMED_PLACE_TYPES: &[&str] = &["premise", "establishment", "point_of_interest"];

fn find_component<'a>(
    components: &'a [AddressComponent],
    types: &[&str],
) -> Option<&'a AddressComponent> {
    components
        .iter()
        .find(|c| types.iter().any(|t| c.types.iter().any(|ct| ct == t)))
}

/// Short name of the first matching component, or empty.
fn component(components: &[AddressComponent], types: &[&str]) -> String {
    find_component(components, types)
        .map(|c| c.short_name.clone())
        .unwrap_or_default()
}

fn first_segment(text: &str) -> &str {
    text.split(',').next().unwrap_or("").trim()
}

fn first_non_empty<'a>(candidates: impl IntoIterator<Item = &'a str>) -> String {
    candidates
        .into_iter()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("")
        .to_string()
}

fn join_non_empty<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fills the structured fields of `address` from provider address components.
pub(crate) fn apply_components(address: &mut AddressComponents, components: &[AddressComponent]) {
    address.building_name = component(components, BUILDING_TYPES);
    address.flat_number = component(components, FLAT_TYPES);
    address.street_number = component(components, STREET_NUMBER_TYPES);
    address.street = component(components, STREET_TYPES);
    address.area = component(components, AREA_TYPES);
    address.landmark = component(components, LANDMARK_TYPES);
    address.city = component(components, CITY_TYPES);
    address.state = component(components, STATE_TYPES);
    address.state_code = component(components, STATE_TYPES);
    address.country = component(components, COUNTRY_TYPES);
    address.country_code = component(components, COUNTRY_TYPES);
    address.postal_code = component(components, POSTAL_CODE_TYPES);
}

/// Guarantees a non-empty primary line for a successful resolution.
fn ensure_display_text(address: &mut AddressComponents, coords: Coordinates) {
    if address.primary_text.is_empty() {
        address.primary_text = first_segment(&address.formatted_address).to_string();
    }
    if address.primary_text.is_empty() {
        address.primary_text = coords.to_string();
    }
}

/// Maps ranked provider results into an address. `None` if there are none.
pub fn parse_geocoding_results(
    results: &[GeocodeResult],
    coords: Coordinates,
) -> Option<AddressComponents> {
    let primary = results.first()?;

    let place_name = results
        .iter()
        .find(|r| r.types.iter().any(|t| NAMED_PLACE_TYPES.contains(&t.as_str())))
        .map(|r| first_segment(&r.formatted_address))
        .unwrap_or("");

    let mut address = AddressComponents {
        place_id: primary.place_id.clone(),
        formatted_address: primary.formatted_address.clone(),
        ..AddressComponents::default()
    };
    apply_components(&mut address, &primary.address_components);

    address.primary_text = first_non_empty([
        place_name,
        address.area.as_str(),
        address.street.as_str(),
        address.city.as_str(),
    ]);
    address.secondary_text = join_non_empty([address.area.as_str(), address.city.as_str()]);
    ensure_display_text(&mut address, coords);

    Some(address)
}

/// Maps an on-device geocoder answer. No place IDs or flat granularity here.
pub fn from_device_place(place: DevicePlace, coords: Coordinates) -> AddressComponents {
    let text = |v: &Option<String>| v.as_deref().map(str::trim).unwrap_or("").to_string();

    let name = text(&place.name);
    let street = text(&place.street);
    let area = first_non_empty([
        place.district.as_deref().unwrap_or(""),
        place.subregion.as_deref().unwrap_or(""),
    ]);
    let city = text(&place.city);
    let region = text(&place.region);

    let mut address = AddressComponents {
        formatted_address: join_non_empty([
            name.as_str(),
            street.as_str(),
            area.as_str(),
            city.as_str(),
            region.as_str(),
        ]),
        primary_text: first_non_empty([name.as_str(), area.as_str(), street.as_str()]),
        secondary_text: join_non_empty([area.as_str(), city.as_str()]),
        building_name: name.clone(),
        street_number: text(&place.street_number),
        street,
        area,
        city,
        state: region.clone(),
        state_code: region,
        country: text(&place.country),
        country_code: text(&place.iso_country_code),
        postal_code: text(&place.postal_code),
        ..AddressComponents::default()
    };
    ensure_display_text(&mut address, coords);
    address
}

pub struct AddressResolver {
    maps: Arc<dyn MapsApi>,
    device: Arc<dyn DeviceGeocoder>,
    timeout: Duration,
}

impl AddressResolver {
    pub fn new(maps: Arc<dyn MapsApi>, device: Arc<dyn DeviceGeocoder>, timeout: Duration) -> Self {
        Self {
            maps,
            device,
            timeout,
        }
    }

    pub async fn resolve_address(
        &self,
        coords: Coordinates,
    ) -> Result<AddressComponents, LocationError> {
        match self.resolve_primary(coords).await {
            Ok(address) => return Ok(address),
            Err(reason) => warn!("Provider geocoding failed, using fallback: {}", reason),
        }

        self.resolve_fallback(coords).await
    }

    async fn resolve_primary(&self, coords: Coordinates) -> Result<AddressComponents, String> {
        let response = tokio::time::timeout(self.timeout, self.maps.reverse_geocode(coords))
            .await
            .map_err(|_| format!("timed out after {:?}", self.timeout))?
            .map_err(|e| e.to_string())?;

        if response.status != "OK" {
            return Err(response
                .error_message
                .unwrap_or_else(|| format!("status {}", response.status)));
        }

        parse_geocoding_results(&response.results, coords)
            .ok_or_else(|| "no results".to_string())
    }

    async fn resolve_fallback(
        &self,
        coords: Coordinates,
    ) -> Result<AddressComponents, LocationError> {
        let place = tokio::time::timeout(self.timeout, self.device.reverse_geocode(coords))
            .await
            .map_err(|_| PlatformError::Timeout(self.timeout))
            .and_then(|r| r)
            .map_err(|e| LocationError::Resolution(e.to_string()))?;

        match place {
            Some(place) => {
                debug!("Device geocoder resolved {}", coords);
                Ok(from_device_place(place, coords))
            }
            None => Err(LocationError::Resolution(format!(
                "no address found for {coords}"
            ))),
        }
    }
}
