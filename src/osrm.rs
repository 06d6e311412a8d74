//! OSRM HTTP adapter for driving directions.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::RoutingError;
use crate::model::LegDuration;
use crate::polyline::{POLYLINE5, Polyline};
use crate::traits::{DirectionsProvider, DirectionsRequest, RoutedPath};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "driving".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// `/route/v1` keeps coordinates in the order given, so the stop order
    /// chosen by the user is what gets routed.
    pub fn route_url(&self, request: &DirectionsRequest) -> String {
        if request.optimize_waypoints {
            warn!("OSRM /route does not optimize waypoints; routing in given order");
        }

        let coords = request
            .points()
            .iter()
            .map(|(lat, lng)| format!("{:.6},{:.6}", lng, lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/route/v1/{}/{}?overview=full&geometries=polyline&steps=false",
            self.config.base_url, self.config.profile, coords
        )
    }
}

impl DirectionsProvider for OsrmClient {
    fn route(&self, request: &DirectionsRequest) -> Result<RoutedPath, RoutingError> {
        let url = self.route_url(request);
        debug!(url = %url, "calling OSRM route");

        // OSRM answers 400 with a JSON body for NoRoute and friends.
        let body = self.client.get(&url).send()?.text()?;
        parse_route_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: Option<String>,
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    duration: f64,
}

fn parse_route_response(body: &str) -> Result<RoutedPath, RoutingError> {
    let response: OsrmRouteResponse = serde_json::from_str(body)?;

    if response.code != "Ok" {
        return Err(RoutingError::Rejected {
            code: response.code,
            message: response.message.unwrap_or_default(),
        });
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| RoutingError::InvalidResponse("no route in Ok response".to_string()))?;

    let geometry = match route.geometry.as_deref() {
        Some(encoded) => Polyline::decode(encoded, POLYLINE5)
            .ok_or_else(|| RoutingError::InvalidResponse("malformed route geometry".to_string()))?,
        None => Polyline::default(),
    };

    let legs = route
        .legs
        .iter()
        .map(|leg| LegDuration::from_seconds(leg.duration.max(0.0).round() as u32))
        .collect();

    Ok(RoutedPath { legs, geometry })
}
