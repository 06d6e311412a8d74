//! Collaborator interfaces for the route map.
//!
//! Storage, geocoding and routing live outside this crate. Concrete apps
//! implement these for their backend; `store`, `geocode`, `osrm` and
//! `haversine` provide ready-made implementations.

use crate::error::{GeocodeError, RoutingError, StoreError};
use crate::model::{
    Customer, CustomerId, LatLng, LegDuration, RepId, Route, RouteId, RouteStop, RouteUpdate,
    RouteWithStops, StopId,
};
use crate::polyline::Polyline;

/// Result of a successful address lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeHit {
    pub position: LatLng,
    pub formatted_address: String,
}

/// Resolves free-form address text to a position.
pub trait AddressGeocoder: Send + Sync {
    /// Returns the first match for `query`, or `GeocodeError::NotFound`.
    fn geocode(&self, query: &str) -> Result<GeocodeHit, GeocodeError>;

    /// False while the provider is still loading. Lookups are skipped, not failed.
    fn is_ready(&self) -> bool {
        true
    }
}

pub trait CustomerStore: Send + Sync {
    fn customers(&self) -> Result<Vec<Customer>, StoreError>;

    fn customer(&self, id: CustomerId) -> Result<Customer, StoreError>;

    /// Persist a resolved position. Callers treat this as best effort.
    fn update_coordinates(&self, id: CustomerId, lat: f64, lng: f64) -> Result<(), StoreError>;
}

pub trait RouteStore: Send + Sync {
    fn routes_for_rep(&self, rep_id: RepId) -> Result<Vec<Route>, StoreError>;

    fn create_route(&self, rep_id: RepId, name: &str) -> Result<Route, StoreError>;

    fn delete_route(&self, route_id: RouteId) -> Result<(), StoreError>;

    fn route_with_stops(&self, route_id: RouteId) -> Result<RouteWithStops, StoreError>;

    fn update_route(&self, route_id: RouteId, update: RouteUpdate) -> Result<Route, StoreError>;

    /// Appends a stop at the end of the route.
    fn add_stop(&self, route_id: RouteId, customer_id: CustomerId) -> Result<RouteStop, StoreError>;

    fn remove_stop(&self, stop_id: StopId) -> Result<(), StoreError>;

    /// Rewrites every stop's order to its position in `ordered` (1..N).
    fn reorder_stops(&self, route_id: RouteId, ordered: &[StopId]) -> Result<(), StoreError>;
}

/// A driving directions query through stops in a fixed order.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionsRequest {
    pub origin: LatLng,
    pub destination: LatLng,
    pub waypoints: Vec<LatLng>,
    pub optimize_waypoints: bool,
}

impl DirectionsRequest {
    /// Origin, waypoints and destination in travel order.
    pub fn points(&self) -> Vec<LatLng> {
        let mut points = Vec::with_capacity(self.waypoints.len() + 2);
        points.push(self.origin);
        points.extend(self.waypoints.iter().copied());
        points.push(self.destination);
        points
    }
}

/// A routed path: one leg per consecutive pair of points.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedPath {
    pub legs: Vec<LegDuration>,
    pub geometry: Polyline,
}

pub trait DirectionsProvider: Send + Sync {
    fn route(&self, request: &DirectionsRequest) -> Result<RoutedPath, RoutingError>;

    fn is_ready(&self) -> bool {
        true
    }
}
