//! Geographic utilities: great-circle distance, path integration and
//! odometer deltas.

use std::borrow::Borrow;

use geo::{algorithm::simplify::Simplify, Coord, LineString};

use crate::{GpsPoint, PositionPoint};

/// Earth radius used for all distance computations (meters).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (Haversine formula).
///
/// NaN or infinite coordinates propagate to the result.
///
/// # Example
/// ```
/// use trip_detector::GpsPoint;
/// use trip_detector::geo_utils::haversine_distance;
///
/// let munich = GpsPoint::new(48.1374, 11.5755);
/// let augsburg = GpsPoint::new(48.3705, 10.8978);
/// let d = haversine_distance(&munich, &augsburg);
/// assert!((d - 56_500.0).abs() < 1_000.0);
/// ```
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let d_lat = (p2.latitude - p1.latitude).to_radians();
    let d_lon = (p2.longitude - p1.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Total length of a polyline in meters.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// GPS-integrated path distance over a position sequence, in kilometers.
pub fn gps_distance_km<P: Borrow<PositionPoint>>(positions: &[P]) -> f64 {
    let meters: f64 = positions
        .windows(2)
        .map(|w| {
            let a: &PositionPoint = w[0].borrow();
            let b: &PositionPoint = w[1].borrow();
            haversine_distance(&a.point(), &b.point())
        })
        .sum();
    meters / 1000.0
}

/// Odometer distance in kilometers between two readings in meters.
///
/// A decreasing reading (meter reset, swapped device) clamps to zero.
pub fn odometer_distance_km(start_odometer_m: f64, end_odometer_m: f64) -> f64 {
    ((end_odometer_m - start_odometer_m) / 1000.0).max(0.0)
}

/// Round to a fixed number of decimals.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Douglas-Peucker simplification of a track.
///
/// `tolerance` is in degrees (0.0001 is roughly 11 meters).
pub fn simplify_track(points: &[GpsPoint], tolerance: f64) -> Vec<GpsPoint> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let coords: Vec<Coord<f64>> = points
        .iter()
        .map(|p| Coord {
            x: p.longitude,
            y: p.latitude,
        })
        .collect();

    LineString::new(coords)
        .simplify(&tolerance)
        .coords()
        .map(|c| GpsPoint::new(c.y, c.x))
        .collect()
}
