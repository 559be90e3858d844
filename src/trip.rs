//! Trip result building: admission checks, distance reconciliation and
//! speed statistics for a candidate window.

use std::borrow::Borrow;

use log::debug;

use crate::geo_utils::{gps_distance_km, round_to, simplify_track};
use crate::reconcile::{reconcile_distance, window_odometer_km};
use crate::{DeviceStandard, GpsPoint, PositionPoint, TripDetectionConfig, TripResult};

/// Turn a candidate window into a trip, or reject it.
///
/// Rejected (returns `None`) when the window has fewer than two samples,
/// lasts less than `min_trip_duration_sec`, or its reconciled distance is
/// below `min_trip_distance_m`. Rejection is not an error.
pub fn build_trip<P: Borrow<PositionPoint>>(
    window: &[P],
    standard: DeviceStandard,
    config: &TripDetectionConfig,
) -> Option<TripResult> {
    if window.len() < 2 {
        return None;
    }
    let first: &PositionPoint = window.first()?.borrow();
    let last: &PositionPoint = window.last()?.borrow();

    let duration_sec = last.millis_since(&first.recorded_at) as f64 / 1000.0;
    if !(duration_sec >= config.min_trip_duration_sec) {
        debug!(
            "[Trip] Rejected window starting {}: {:.0}s shorter than {:.0}s",
            first.recorded_at, duration_sec, config.min_trip_duration_sec
        );
        return None;
    }

    let gps_km = gps_distance_km(window);
    let reconciled = reconcile_distance(gps_km, window_odometer_km(window, standard), config);

    // Negated comparison so a NaN distance is rejected too
    if !(reconciled.distance_km * 1000.0 >= config.min_trip_distance_m) {
        debug!(
            "[Trip] Rejected window starting {}: {:.0}m shorter than {:.0}m",
            first.recorded_at,
            reconciled.distance_km * 1000.0,
            config.min_trip_distance_m
        );
        return None;
    }

    let max_speed_kmh = window
        .iter()
        .map(|p| Borrow::<PositionPoint>::borrow(p).speed)
        .filter(|&s| s > 0.0)
        .fold(0.0, f64::max);

    let avg_speed_kmh = if duration_sec > 0.0 {
        reconciled.distance_km / (duration_sec / 3600.0)
    } else {
        0.0
    };

    Some(TripResult {
        start_time: first.recorded_at,
        end_time: last.recorded_at,
        start_lat: first.lat,
        start_lon: first.lon,
        end_lat: last.lat,
        end_lon: last.lon,
        distance_km: round_to(reconciled.distance_km, 2),
        distance_source: reconciled.source,
        positions_count: u32::try_from(window.len()).unwrap_or(u32::MAX),
        max_speed_kmh: round_to(max_speed_kmh, 1),
        avg_speed_kmh: round_to(avg_speed_kmh, 1),
    })
}

/// Recompute statistics for a trip whose positions are already known.
///
/// Applies the same admission checks and reconciliation as detection, but
/// skips drift filtering and segmentation: the caller has bounded the trip
/// (for example after a manual edit in the logbook).
pub fn compute_trip_summary(
    positions: &[PositionPoint],
    standard: DeviceStandard,
    config: &TripDetectionConfig,
) -> Option<TripResult> {
    build_trip(positions, standard, config)
}

/// Simplified polyline of a trip for map display.
///
/// `tolerance_deg` is the Douglas-Peucker tolerance in degrees.
pub fn trip_track<P: Borrow<PositionPoint>>(window: &[P], tolerance_deg: f64) -> Vec<GpsPoint> {
    let points: Vec<GpsPoint> = window
        .iter()
        .map(|p| Borrow::<PositionPoint>::borrow(p).point())
        .collect();
    simplify_track(&points, tolerance_deg)
}
