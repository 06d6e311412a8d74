//! Error types for the collaborators and adapters.

use std::fmt;

use crate::model::{CustomerId, RouteId, StopId};

#[derive(Debug)]
pub enum GeocodeError {
    /// The provider answered but had no match for the query.
    NotFound(String),
    Http(reqwest::Error),
    InvalidResponse(String),
}

impl fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeocodeError::NotFound(query) => write!(f, "no geocode results for \"{}\"", query),
            GeocodeError::Http(err) => write!(f, "geocode request failed: {}", err),
            GeocodeError::InvalidResponse(msg) => write!(f, "invalid geocode response: {}", msg),
        }
    }
}

impl std::error::Error for GeocodeError {}

impl From<reqwest::Error> for GeocodeError {
    fn from(err: reqwest::Error) -> Self {
        GeocodeError::Http(err)
    }
}

impl From<serde_json::Error> for GeocodeError {
    fn from(err: serde_json::Error) -> Self {
        GeocodeError::InvalidResponse(err.to_string())
    }
}

#[derive(Debug)]
pub enum RoutingError {
    /// The provider is not loaded yet. Callers treat this as "no route".
    Unavailable,
    TooFewStops(usize),
    /// The provider rejected the request, e.g. OSRM `NoRoute`.
    Rejected { code: String, message: String },
    Http(reqwest::Error),
    InvalidResponse(String),
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::Unavailable => write!(f, "directions provider is not available yet"),
            RoutingError::TooFewStops(count) => {
                write!(f, "need at least 2 routable stops, got {}", count)
            }
            RoutingError::Rejected { code, message } => {
                write!(f, "directions request rejected ({}): {}", code, message)
            }
            RoutingError::Http(err) => write!(f, "directions request failed: {}", err),
            RoutingError::InvalidResponse(msg) => write!(f, "invalid directions response: {}", msg),
        }
    }
}

impl std::error::Error for RoutingError {}

impl From<reqwest::Error> for RoutingError {
    fn from(err: reqwest::Error) -> Self {
        RoutingError::Http(err)
    }
}

impl From<serde_json::Error> for RoutingError {
    fn from(err: serde_json::Error) -> Self {
        RoutingError::InvalidResponse(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    RouteNotFound(RouteId),
    StopNotFound(StopId),
    CustomerNotFound(CustomerId),
    /// A reorder did not list exactly the stops of the route.
    StopSetMismatch { route_id: RouteId },
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::RouteNotFound(id) => write!(f, "route {} not found", id),
            StoreError::StopNotFound(id) => write!(f, "route stop {} not found", id),
            StoreError::CustomerNotFound(id) => write!(f, "customer {} not found", id),
            StoreError::StopSetMismatch { route_id } => {
                write!(f, "reorder of route {} must list every stop exactly once", route_id)
            }
            StoreError::Backend(msg) => write!(f, "storage backend error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Invalid { key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { key, value } => {
                write!(f, "invalid value \"{}\" for {}", value, key)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
