//! fieldroute: route map core for field sales reps.
//!
//! Customer coordinate caching with bounded background geocoding, driving
//! legs through a route's stops, and predicted arrival times.

pub mod config;
pub mod coords;
pub mod error;
pub mod geocode;
pub mod haversine;
pub mod legs;
pub mod model;
pub mod osrm;
pub mod polyline;
pub mod schedule;
pub mod store;
pub mod traits;
pub mod view;
