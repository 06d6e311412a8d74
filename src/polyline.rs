//! Route geometry: an ordered list of points, decoded from encoded polylines.
//!
//! Routes are kept as decoded coordinate sequences. Decoding of the compact
//! encoded format happens at the boundary, when a directions response is
//! parsed.

use serde::{Deserialize, Serialize};

use crate::model::LatLng;

/// Precision of the classic encoded polyline format (OSRM `polyline`).
pub const POLYLINE5: u32 = 5;

/// A route geometry as decoded (latitude, longitude) points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<LatLng>,
}

impl Polyline {
    pub fn new(points: Vec<LatLng>) -> Self {
        Self { points }
    }

    /// Decodes an encoded polyline string. Returns `None` on malformed input.
    pub fn decode(encoded: &str, precision: u32) -> Option<Self> {
        let factor = 10f64.powi(precision as i32);
        let bytes = encoded.as_bytes();
        let mut index = 0;
        let mut lat: i64 = 0;
        let mut lng: i64 = 0;
        let mut points = Vec::new();

        while index < bytes.len() {
            lat += next_delta(bytes, &mut index)?;
            lng += next_delta(bytes, &mut index)?;
            points.push((lat as f64 / factor, lng as f64 / factor));
        }

        Some(Self { points })
    }

    pub fn points(&self) -> &[LatLng] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn into_points(self) -> Vec<LatLng> {
        self.points
    }
}

fn next_delta(bytes: &[u8], index: &mut usize) -> Option<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        let chunk = i64::from(*bytes.get(*index)?) - 63;
        if !(0..64).contains(&chunk) || shift > 60 {
            return None;
        }
        *index += 1;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    Some(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[LatLng], expected: &[LatLng]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a.0 - e.0).abs() < 1e-9 && (a.1 - e.1).abs() < 1e-9, "{:?} != {:?}", a, e);
        }
    }

    #[test]
    fn test_decode_reference_polyline() {
        let polyline = Polyline::decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@", POLYLINE5).unwrap();
        assert_close(
            polyline.points(),
            &[(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)],
        );
    }

    #[test]
    fn test_decode_empty() {
        let polyline = Polyline::decode("", POLYLINE5).unwrap();
        assert!(polyline.is_empty());
    }

    #[test]
    fn test_decode_truncated_input() {
        // Latitude without its longitude.
        assert_eq!(Polyline::decode("_p~iF", POLYLINE5), None);
        // Continuation bit set on the last byte.
        assert_eq!(Polyline::decode("_p~iF~", POLYLINE5), None);
    }

    #[test]
    fn test_decode_rejects_out_of_range_bytes() {
        assert_eq!(Polyline::decode("_p~iF ps|U", POLYLINE5), None);
    }

    #[test]
    fn test_into_points() {
        let points = vec![(38.5, -120.2), (40.7, -120.95)];
        let polyline = Polyline::new(points.clone());
        assert_eq!(polyline.into_points(), points);
    }
}
