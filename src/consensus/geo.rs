// src/consensus/geo.rs
//
// Great-circle distance on a spherical earth, and the RMS-weighted centroid
// used for refined cluster locations.

use serde::{Deserialize, Serialize};

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A validated latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// `None` unless both coordinates are finite and within range
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Build from optional coordinates as they arrive from intake payloads
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        Self::new(latitude?, longitude?)
    }

    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        haversine_distance(self, other)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Haversine distance in meters.
///
/// Arguments are put in a canonical order first so the result is bitwise
/// identical for `(a, b)` and `(b, a)`.
pub fn haversine_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (p, q) = if (a.latitude, a.longitude) <= (b.latitude, b.longitude) {
        (a, b)
    } else {
        (b, a)
    };

    let lat1 = p.latitude.to_radians();
    let lat2 = q.latitude.to_radians();
    let dlat = (q.latitude - p.latitude).to_radians();
    let dlon = (q.longitude - p.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Weighted mean of latitudes and longitudes: `sum(w_i * x_i) / sum(w_i)`.
///
/// Planar approximation, adequate at cluster radii. Falls back to the plain
/// mean when the weights sum to (near) zero; `None` for an empty input.
pub fn weighted_centroid(points: &[(GeoPoint, f64)]) -> Option<GeoPoint> {
    if points.is_empty() {
        return None;
    }

    let total: f64 = points.iter().map(|(_, w)| w.max(0.0)).sum();
    let (lat, lon) = if total > 1e-12 {
        let lat = points.iter().map(|(p, w)| p.latitude * w.max(0.0)).sum::<f64>() / total;
        let lon = points.iter().map(|(p, w)| p.longitude * w.max(0.0)).sum::<f64>() / total;
        (lat, lon)
    } else {
        let n = points.len() as f64;
        (
            points.iter().map(|(p, _)| p.latitude).sum::<f64>() / n,
            points.iter().map(|(p, _)| p.longitude).sum::<f64>() / n,
        )
    };

    // Rounding can push the mean a hair outside the member range
    let lat_min = points.iter().map(|(p, _)| p.latitude).fold(f64::INFINITY, f64::min);
    let lat_max = points.iter().map(|(p, _)| p.latitude).fold(f64::NEG_INFINITY, f64::max);
    let lon_min = points.iter().map(|(p, _)| p.longitude).fold(f64::INFINITY, f64::min);
    let lon_max = points.iter().map(|(p, _)| p.longitude).fold(f64::NEG_INFINITY, f64::max);

    Some(GeoPoint {
        latitude: lat.clamp(lat_min, lat_max),
        longitude: lon.clamp(lon_min, lon_max),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn test_distance_is_symmetric_and_zero_on_identity() {
        let pairs = [
            (pt(42.6629, 21.1655), pt(42.6631, 21.1657)),
            (pt(-33.8688, 151.2093), pt(51.5074, -0.1278)),
            (pt(0.0, 179.9), pt(0.0, -179.9)),
            (pt(89.9, 10.0), pt(-89.9, -170.0)),
        ];
        for (a, b) in pairs {
            assert_eq!(haversine_distance(&a, &b), haversine_distance(&b, &a));
            assert_eq!(haversine_distance(&a, &a), 0.0);
            assert_eq!(haversine_distance(&b, &b), 0.0);
        }
    }

    #[test]
    fn test_known_distance() {
        // One degree of latitude ~ 111.195 km on a 6371 km sphere
        let d = haversine_distance(&pt(10.0, 20.0), &pt(11.0, 20.0));
        assert!((d - 111_194.93).abs() < 1.0);
    }

    #[test]
    fn test_antimeridian_is_short() {
        let d = haversine_distance(&pt(0.0, 179.9), &pt(0.0, -179.9));
        assert!(d < 25_000.0);
    }

    #[test]
    fn test_invalid_coordinates_rejected() {
        assert!(GeoPoint::new(91.0, 0.0).is_none());
        assert!(GeoPoint::new(0.0, -180.5).is_none());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_none());
        assert!(GeoPoint::from_parts(None, Some(21.0)).is_none());
        assert!(GeoPoint::from_parts(Some(42.0), Some(21.0)).is_some());
    }

    #[test]
    fn test_weighted_centroid_pulls_towards_heavy_member() {
        let points = [(pt(0.0, 0.0), 1.0), (pt(1.0, 1.0), 3.0)];
        let c = weighted_centroid(&points).unwrap();
        assert!((c.latitude - 0.75).abs() < 1e-12);
        assert!((c.longitude - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_zero_weights_fall_back_to_mean() {
        let points = [(pt(0.0, 0.0), 0.0), (pt(2.0, 4.0), 0.0)];
        let c = weighted_centroid(&points).unwrap();
        assert!((c.latitude - 1.0).abs() < 1e-12);
        assert!((c.longitude - 2.0).abs() < 1e-12);
        assert!(weighted_centroid(&[]).is_none());
    }
}
