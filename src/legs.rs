//! Driving route through the stops of a route, and its per-leg durations.

use tracing::{debug, warn};

use crate::coords::CoordinateCache;
use crate::error::RoutingError;
use crate::model::{LatLng, LegDuration, RouteStop, StopId};
use crate::polyline::Polyline;
use crate::traits::{DirectionsProvider, DirectionsRequest};

/// Builds the directions request for the stops that have a position.
///
/// Stops are visited in the given order; waypoints are never reordered.
pub fn directions_request(
    stops: &[RouteStop],
    cache: &CoordinateCache,
) -> Result<DirectionsRequest, RoutingError> {
    let points: Vec<LatLng> = stops
        .iter()
        .filter_map(|stop| cache.get(stop.customer_id))
        .collect();

    let [origin, waypoints @ .., destination] = points.as_slice() else {
        return Err(RoutingError::TooFewStops(points.len()));
    };

    Ok(DirectionsRequest {
        origin: *origin,
        destination: *destination,
        waypoints: waypoints.to_vec(),
        optimize_waypoints: false,
    })
}

/// What a refresh produced for the parent view.
#[derive(Debug, Clone, PartialEq)]
pub enum LegUpdate {
    /// A new route was drawn; one duration per leg, in stop order.
    Routed(Vec<LegDuration>),
    /// The route was cleared. The parent keeps its previous durations.
    Cleared,
    /// Inputs did not change since the last refresh.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RouteKey {
    show_route: bool,
    /// Stop ids in order, paired with whether the stop has a position.
    stops: Vec<(StopId, bool)>,
}

/// Keeps the polyline currently drawn for a route.
pub struct RouteLegPlanner<D> {
    provider: D,
    geometry: Option<Polyline>,
    last_key: Option<RouteKey>,
}

impl<D: DirectionsProvider> RouteLegPlanner<D> {
    pub fn new(provider: D) -> Self {
        Self {
            provider,
            geometry: None,
            last_key: None,
        }
    }

    pub fn provider(&self) -> &D {
        &self.provider
    }

    /// The drawn route, if any.
    pub fn geometry(&self) -> Option<&Polyline> {
        self.geometry.as_ref()
    }

    /// Recomputes only when the stop order, the show flag, or the set of
    /// stops with a position changed since the last refresh.
    pub fn refresh_if_changed(
        &mut self,
        stops: &[RouteStop],
        cache: &CoordinateCache,
        show_route: bool,
    ) -> LegUpdate {
        let key = RouteKey {
            show_route,
            stops: stops
                .iter()
                .map(|stop| (stop.id, cache.contains(stop.customer_id)))
                .collect(),
        };
        if self.last_key.as_ref() == Some(&key) {
            return LegUpdate::Unchanged;
        }
        self.last_key = Some(key);
        self.refresh(stops, cache, show_route)
    }

    /// Always recomputes; the latest call wins.
    pub fn refresh(
        &mut self,
        stops: &[RouteStop],
        cache: &CoordinateCache,
        show_route: bool,
    ) -> LegUpdate {
        if !show_route {
            self.geometry = None;
            return LegUpdate::Cleared;
        }

        let request = match directions_request(stops, cache) {
            Ok(request) => request,
            Err(err) => {
                debug!(error = %err, "not enough positioned stops to route");
                self.geometry = None;
                return LegUpdate::Cleared;
            }
        };

        if !self.provider.is_ready() {
            debug!("directions provider not ready");
            self.geometry = None;
            // Retry on the next refresh even if nothing else changes.
            self.last_key = None;
            return LegUpdate::Cleared;
        }

        match self.provider.route(&request) {
            Ok(path) => {
                debug!(legs = path.legs.len(), "route computed");
                self.geometry = Some(path.geometry);
                LegUpdate::Routed(path.legs)
            }
            Err(err) => {
                warn!(error = %err, "routing failed");
                self.geometry = None;
                LegUpdate::Cleared
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(id: StopId, customer_id: i64, order: u32) -> RouteStop {
        RouteStop {
            id,
            route_id: 1,
            customer_id,
            stop_order: order,
        }
    }

    #[test]
    fn request_skips_unpositioned_stops() {
        let cache = CoordinateCache::new();
        cache.insert(10, (1.0, 1.0));
        cache.insert(30, (3.0, 3.0));
        cache.insert(40, (4.0, 4.0));
        let stops = vec![stop(1, 10, 1), stop(2, 20, 2), stop(3, 30, 3), stop(4, 40, 4)];

        let request = directions_request(&stops, &cache).unwrap();
        assert_eq!(request.origin, (1.0, 1.0));
        assert_eq!(request.waypoints, vec![(3.0, 3.0)]);
        assert_eq!(request.destination, (4.0, 4.0));
        assert!(!request.optimize_waypoints);
    }

    #[test]
    fn request_needs_two_positioned_stops() {
        let cache = CoordinateCache::new();
        cache.insert(10, (1.0, 1.0));
        let stops = vec![stop(1, 10, 1), stop(2, 20, 2)];

        let err = directions_request(&stops, &cache).unwrap_err();
        assert!(matches!(err, RoutingError::TooFewStops(1)));
    }
}
