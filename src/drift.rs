//! GPS drift suppression.
//!
//! A parked vehicle keeps reporting fixes that wander a few meters around
//! its true position. Left in, this jitter integrates into phantom distance
//! and can open phantom trips. The filter is a single forward pass that keeps
//! a sample only if it moved far enough from the last kept sample or reports
//! a real speed. There is no look-ahead and no smoothing.

use crate::geo_utils::haversine_distance;
use crate::PositionPoint;

/// Whether `candidate` should be kept after `last_retained`.
///
/// Kept if it lies more than `radius_m` from the last retained sample, or
/// if its own speed is at least `min_speed_kmh`.
pub fn is_significant(
    last_retained: &PositionPoint,
    candidate: &PositionPoint,
    radius_m: f64,
    min_speed_kmh: f64,
) -> bool {
    haversine_distance(&last_retained.point(), &candidate.point()) > radius_m
        || candidate.speed >= min_speed_kmh
}

/// Remove drift samples from a chronologically ordered sequence.
///
/// The first sample is always kept. Every later sample is compared against
/// the last *kept* sample, not its original predecessor, so a slow creep of
/// small steps is still caught once it leaves the radius.
pub fn filter_gps_drift(
    positions: &[PositionPoint],
    radius_m: f64,
    min_speed_kmh: f64,
) -> Vec<&PositionPoint> {
    let mut filtered: Vec<&PositionPoint> = Vec::with_capacity(positions.len());

    for pos in positions {
        let keep = match filtered.last() {
            Some(last) => is_significant(last, pos, radius_m, min_speed_kmh),
            None => true,
        };
        if keep {
            filtered.push(pos);
        }
    }

    filtered
}
