//! # Geographic Utilities
//!
//! Distance computations used by the lag table and the spatial scan.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_meters`] | Great-circle distance between two lat/lon pairs |
//! | [`haversine_distance`] | Same, for two [`Coordinate`]s |
//! | [`round_meters`] | Round a distance to centimetres (2 decimals) |
//! | [`meters_to_degrees`] | Convert meters to approximate degrees at a latitude |
//!
//! ## Example
//!
//! ```rust
//! use outlet_proximity::{Coordinate, geo_utils};
//!
//! // Two outlets in Medan, roughly 1 km apart
//! let a = Coordinate::new(3.5952, 98.6722);
//! let b = Coordinate::new(3.6000, 98.6800);
//!
//! let meters = geo_utils::round_meters(geo_utils::haversine_distance(&a, &b));
//! assert!(meters > 900.0 && meters < 1100.0);
//! ```
//!
//! ## Algorithm Notes
//!
//! The haversine formula treats the Earth as a sphere with mean radius
//! 6,371.0 km. There is no ellipsoid correction; at outlet spacing (tens to
//! thousands of meters) the error is well below GPS noise.
//!
//! Reference: [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)

use crate::Coordinate;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance in meters between two points given in degrees.
///
/// Non-negative, symmetric, and zero when both points are identical.
///
/// # Arguments
///
/// * `lat1`, `lon1` - First point, in degrees
/// * `lat2`, `lon2` - Second point, in degrees
///
/// # Example
///
/// ```rust
/// use outlet_proximity::geo_utils::haversine_meters;
///
/// assert_eq!(haversine_meters(3.5952, 98.6722, 3.5952, 98.6722), 0.0);
/// let d = haversine_meters(3.5952, 98.6722, 3.6000, 98.6800);
/// assert_eq!(d, haversine_meters(3.6000, 98.6800, 3.5952, 98.6722));
/// ```
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Clamp guards sqrt(1 - a) against a drifting a hair above 1.0
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Great-circle distance in meters between two coordinates.
#[inline]
pub fn haversine_distance(p1: &Coordinate, p2: &Coordinate) -> f64 {
    haversine_meters(p1.latitude, p1.longitude, p2.latitude, p2.longitude)
}

/// Round a distance in meters to 2 decimal places.
///
/// Threshold comparisons and reports all work on the rounded value, so two
/// runs over the same table always agree on which side of the threshold an
/// entry falls.
#[inline]
pub fn round_meters(meters: f64) -> f64 {
    (meters * 100.0).round() / 100.0
}

/// Convert meters to approximate degrees at a given latitude.
///
/// Uses the longitude scale (`111,320 m * cos(lat)`), which is the larger of
/// the two degree sizes, so a box built from the result always covers a
/// circle of the given radius. The cosine is floored at 0.1 to keep the box
/// finite near the poles.
///
/// # Notes
///
/// - At the equator, 1 degree ≈ 111,320 meters
/// - At 45°N/S, 1 degree of longitude ≈ 78,710 meters
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lat_rad = latitude.to_radians();
    let meters_per_degree = 111_320.0 * lat_rad.cos().max(0.1);
    meters / meters_per_degree
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_same_point() {
        for (lat, lon) in [(0.0, 0.0), (3.5952, 98.6722), (-89.9, 179.9), (51.5074, -0.1278)] {
            assert_eq!(haversine_meters(lat, lon, lat, lon), 0.0);
        }
    }

    #[test]
    fn test_haversine_symmetric() {
        let pairs = [
            ((3.5952, 98.6722), (3.6000, 98.6800)),
            ((51.5074, -0.1278), (48.8566, 2.3522)),
            ((-33.8688, 151.2093), (35.6762, 139.6503)),
        ];
        for ((lat1, lon1), (lat2, lon2)) in pairs {
            assert_eq!(
                haversine_meters(lat1, lon1, lat2, lon2),
                haversine_meters(lat2, lon2, lat1, lon1)
            );
        }
    }

    #[test]
    fn test_haversine_medan_fixture() {
        let d = haversine_meters(3.5952, 98.6722, 3.6000, 98.6800);
        assert!(d > 900.0 && d < 1100.0, "got {}", d);
    }

    #[test]
    fn test_haversine_known_value() {
        // London to Paris is approximately 344 km
        let dist = haversine_meters(51.5074, -0.1278, 48.8566, 2.3522);
        assert!(approx_eq(dist, 343_560.0, 5000.0));
    }

    #[test]
    fn test_haversine_antipodal_is_finite() {
        let d = haversine_meters(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert!(approx_eq(d, std::f64::consts::PI * EARTH_RADIUS_METERS, 1.0));
    }

    #[test]
    fn test_one_degree_latitude() {
        let d = haversine_meters(0.0, 0.0, 1.0, 0.0);
        assert!(approx_eq(d, 111_194.93, 1.0));
    }

    #[test]
    fn test_round_meters() {
        assert_eq!(round_meters(50.004), 50.0);
        assert_eq!(round_meters(50.006), 50.01);
        assert_eq!(round_meters(0.0), 0.0);
    }

    #[test]
    fn test_meters_to_degrees() {
        let deg = meters_to_degrees(111_320.0, 0.0);
        assert!(approx_eq(deg, 1.0, 0.01));

        // At higher latitude, same distance = more degrees
        let deg_45 = meters_to_degrees(111_320.0, 45.0);
        assert!(deg_45 > 1.0);
    }
}
