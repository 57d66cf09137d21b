//! # Geographic Utilities
//!
//! Great-circle distance and length accounting for trail polylines.
//!
//! All distances in this crate are in **kilometers**. Endpoint adjacency is
//! decided by comparing these distances against the configured tolerance, so
//! identical coordinates must yield exactly `0.0` (they do: the haversine of a
//! point with itself is algebraically zero).
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`distance`] | Haversine distance from raw latitude/longitude pairs |
//! | [`haversine_distance_km`] | Haversine distance between two [`GeoPoint`]s |
//! | [`polyline_length_km`] | Total length of a polyline |
//! | [`km_to_degrees`] | Degree half-widths of a box enclosing a distance circle |
//!
//! ## Example
//!
//! ```rust
//! use trail_stitcher::{GeoPoint, geo_utils};
//!
//! let track = vec![
//!     GeoPoint::new(39.4917, -77.4841),
//!     GeoPoint::new(39.4950, -77.4835),
//!     GeoPoint::new(39.4992, -77.4831),
//! ];
//!
//! let length = geo_utils::polyline_length_km(&track);
//! println!("Trail length: {:.2} km", length);
//! ```
//!
//! ## Coordinate System
//!
//! All functions expect WGS84 coordinates in degrees.

use crate::GeoPoint;
use geo::{Distance, Haversine, Point};
use std::f64::consts::FRAC_PI_2;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance in kilometers between two latitude/longitude pairs.
///
/// Pure and side-effect free. Uses a spherical Earth of mean radius 6,371 km.
///
/// # Example
///
/// ```rust
/// use trail_stitcher::geo_utils::distance;
///
/// assert_eq!(distance(39.49, -77.48, 39.49, -77.48), 0.0);
///
/// // London to Paris is about 344 km
/// let km = distance(51.5074, -0.1278, 48.8566, 2.3522);
/// assert!((km - 343.56).abs() < 1.0);
/// ```
#[inline]
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let point1 = Point::new(lon1, lat1);
    let point2 = Point::new(lon2, lat2);
    Haversine::distance(point1, point2) / 1000.0
}

/// Great-circle distance in kilometers between two points.
///
/// Elevation is ignored.
#[inline]
pub fn haversine_distance_km(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    distance(p1.latitude, p1.longitude, p2.latitude, p2.longitude)
}

/// Total length of a polyline in kilometers.
///
/// Sums the distance between consecutive points. Empty or single-point
/// polylines return 0.0.
pub fn polyline_length_km(points: &[GeoPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance_km(&w[0], &w[1]))
        .sum()
}

/// Mean Earth radius in kilometers, the one [`Haversine`] measures with.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Half-widths in degrees `(latitude, longitude)` of a box centred at
/// `latitude` that contains every point within `km` of the centre.
///
/// The latitude half-width is the arc length `km` along a meridian. The
/// longitude half-width is the widest longitude offset any point of the
/// circle reaches, which grows towards the poles; once the circle touches a
/// pole it is `180.0`. Callers confirm candidates with
/// [`haversine_distance_km`].
///
/// # Example
///
/// ```rust
/// use trail_stitcher::geo_utils::km_to_degrees;
///
/// let (dlat, dlon) = km_to_degrees(111.195, 60.0);
/// assert!((dlat - 1.0).abs() < 0.001);
/// assert!(dlon > 2.0);
/// ```
pub fn km_to_degrees(km: f64, latitude: f64) -> (f64, f64) {
    // Slack for rounding, so points exactly on the circle stay inside
    let angle = km / EARTH_RADIUS_KM * (1.0 + 1e-9);
    let lat_degrees = angle.to_degrees();

    let phi = latitude.to_radians();
    if phi.abs() + angle >= FRAC_PI_2 {
        return (lat_degrees, 180.0);
    }
    let lon_degrees = (angle.sin() / phi.cos()).asin().to_degrees();
    (lat_degrees, lon_degrees)
}

// =============================================================================
// Unit Tests
// =============================================================================
