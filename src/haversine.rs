//! Straight-line directions (fallback when no routing server is reachable).
//!
//! Uses great-circle distance and an assumed speed to estimate leg
//! durations. Ignores roads, so arrival times come out optimistic.

use crate::error::RoutingError;
use crate::model::{LatLng, LegDuration};
use crate::polyline::Polyline;
use crate::traits::{DirectionsProvider, DirectionsRequest, RoutedPath};

/// Mixed urban and arterial driving.
const FALLBACK_SPEED_KMH: f64 = 40.0;

const MEAN_EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone)]
pub struct HaversineDirections {
    pub speed_kmh: f64,
}

impl Default for HaversineDirections {
    fn default() -> Self {
        Self {
            speed_kmh: FALLBACK_SPEED_KMH,
        }
    }
}

impl HaversineDirections {
    pub fn new(speed_kmh: f64) -> Self {
        HaversineDirections { speed_kmh }
    }

    /// Great-circle distance in kilometres.
    pub fn haversine_km((lat_a, lng_a): LatLng, (lat_b, lng_b): LatLng) -> f64 {
        let half_dlat = (lat_b - lat_a).to_radians() / 2.0;
        let half_dlng = (lng_b - lng_a).to_radians() / 2.0;
        let h = half_dlat.sin().powi(2)
            + lat_a.to_radians().cos() * lat_b.to_radians().cos() * half_dlng.sin().powi(2);

        2.0 * MEAN_EARTH_RADIUS_KM * h.sqrt().asin()
    }

    fn km_to_seconds(&self, km: f64) -> u32 {
        (km * 3600.0 / self.speed_kmh).round() as u32
    }
}

impl DirectionsProvider for HaversineDirections {
    fn route(&self, request: &DirectionsRequest) -> Result<RoutedPath, RoutingError> {
        if self.speed_kmh <= 0.0 {
            return Err(RoutingError::InvalidResponse(format!(
                "speed must be positive, got {}",
                self.speed_kmh
            )));
        }

        let points = request.points();
        let legs = points
            .windows(2)
            .map(|pair| {
                let km = Self::haversine_km(pair[0], pair[1]);
                LegDuration::from_seconds(self.km_to_seconds(km))
            })
            .collect();

        Ok(RoutedPath {
            legs,
            geometry: Polyline::new(points),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_points_are_zero_apart() {
        let dist = HaversineDirections::haversine_km((52.5015, 13.3411), (52.5015, 13.3411));
        assert!(dist < 0.001, "got {}", dist);
    }

    #[test]
    fn berlin_to_hamburg() {
        // Berlin (52.52, 13.405) to Hamburg (53.551, 9.994), ~255 km
        let dist = HaversineDirections::haversine_km((52.52, 13.405), (53.551, 9.994));
        assert!(dist > 240.0 && dist < 270.0, "Berlin to Hamburg should be ~255km, got {}", dist);
    }

    #[test]
    fn one_leg_per_consecutive_pair() {
        let provider = HaversineDirections::default();
        let request = DirectionsRequest {
            origin: (52.50, 13.40),
            destination: (52.53, 13.43),
            waypoints: vec![(52.51, 13.41), (52.52, 13.42)],
            optimize_waypoints: false,
        };

        let path = provider.route(&request).unwrap();
        assert_eq!(path.legs.len(), 3);
        assert_eq!(path.geometry.points().len(), 4);
        assert!(path.legs.iter().all(|leg| leg.seconds > 0));
    }

    #[test]
    fn seconds_follow_speed() {
        assert_eq!(HaversineDirections::new(40.0).km_to_seconds(10.0), 900);
        assert_eq!(HaversineDirections::new(60.0).km_to_seconds(1.5), 90);
    }

    #[test]
    fn rejects_non_positive_speed() {
        let provider = HaversineDirections::new(0.0);
        let request = DirectionsRequest {
            origin: (0.0, 0.0),
            destination: (1.0, 1.0),
            waypoints: Vec::new(),
            optimize_waypoints: false,
        };
        assert!(provider.route(&request).is_err());
    }
}
