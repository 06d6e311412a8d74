//! Address geocoding with a session cache keyed by normalized address text.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::GeocodeError;
use crate::model::Address;
use crate::traits::{AddressGeocoder, GeocodeHit};

type Slot = Arc<Mutex<Option<GeocodeHit>>>;

/// Geocodes addresses through an [`AddressGeocoder`], memoizing hits by
/// query text so customers sharing an address share one provider request.
pub struct GeocodingService<G> {
    geocoder: Arc<G>,
    country: String,
    slots: Mutex<HashMap<String, Slot>>,
}

impl<G: AddressGeocoder> GeocodingService<G> {
    pub fn new(geocoder: Arc<G>, country: impl Into<String>) -> Self {
        Self {
            geocoder,
            country: country.into(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// `Ok(None)` when the address is empty or the provider is not ready yet.
    /// Failures are not cached.
    pub fn geocode_address(
        &self,
        address: Address<'_>,
    ) -> Result<Option<GeocodeHit>, GeocodeError> {
        let Some(query) = address.query(&self.country) else {
            return Ok(None);
        };

        let slot = self.slot(&query);
        // Held across the lookup so concurrent callers for the same text wait
        // for this request instead of issuing their own.
        let mut cached = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cached.as_ref() {
            debug!(query = %query, "geocode cache hit");
            return Ok(Some(hit.clone()));
        }

        if !self.geocoder.is_ready() {
            debug!(query = %query, "geocoder not ready, skipping lookup");
            return Ok(None);
        }

        match self.geocoder.geocode(&query) {
            Ok(hit) => {
                *cached = Some(hit.clone());
                Ok(Some(hit))
            }
            Err(err) => {
                warn!(query = %query, error = %err, "geocoding failed");
                Err(err)
            }
        }
    }

    pub fn cached(&self, query: &str) -> Option<GeocodeHit> {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(query)
            .cloned()?;
        let hit = slot.lock().unwrap_or_else(PoisonError::into_inner).clone();
        hit
    }

    pub fn clear(&self) {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn slot(&self, query: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(query.to_string()).or_default().clone()
    }
}

#[derive(Debug, Clone)]
pub struct NominatimConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("fieldroute/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 10,
        }
    }
}

/// Nominatim-compatible `/search` adapter.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    config: NominatimConfig,
    client: reqwest::blocking::Client,
}

impl NominatimGeocoder {
    pub fn new(config: NominatimConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }
}

impl AddressGeocoder for NominatimGeocoder {
    fn geocode(&self, query: &str) -> Result<GeocodeHit, GeocodeError> {
        let url = format!("{}/search", self.config.base_url);
        debug!(query = %query, "calling nominatim search");

        let body = self
            .client
            .get(url)
            .query(&[("q", query), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())?;

        parse_search_response(query, &body)
    }
}

#[derive(Debug, Deserialize)]
struct SearchPlace {
    lat: String,
    lon: String,
    display_name: String,
}

fn parse_search_response(query: &str, body: &str) -> Result<GeocodeHit, GeocodeError> {
    let places: Vec<SearchPlace> = serde_json::from_str(body)?;
    let place = places
        .into_iter()
        .next()
        .ok_or_else(|| GeocodeError::NotFound(query.to_string()))?;

    let lat = place
        .lat
        .parse::<f64>()
        .map_err(|_| GeocodeError::InvalidResponse(format!("bad latitude {:?}", place.lat)))?;
    let lng = place
        .lon
        .parse::<f64>()
        .map_err(|_| GeocodeError::InvalidResponse(format!("bad longitude {:?}", place.lon)))?;

    Ok(GeocodeHit {
        position: (lat, lng),
        formatted_address: place.display_name,
    })
}
