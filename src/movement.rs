//! Per-sample movement classification.

use crate::{DeviceStandard, PositionPoint, TripDetectionConfig};

/// Whether the vehicle is moving at this sample.
///
/// Standard B devices with an ignition key are moving exactly when the
/// ignition is on, regardless of speed; a `null` or non-boolean ignition
/// counts as off. Everything else (Standard A, or a Standard B sample
/// without an ignition key) falls back to `speed >= min_speed_kmh`.
pub fn is_moving(
    position: &PositionPoint,
    standard: DeviceStandard,
    config: &TripDetectionConfig,
) -> bool {
    match (standard, position.attributes.ignition) {
        (DeviceStandard::B, Some(ignition)) => ignition,
        _ => position.speed >= config.min_speed_kmh,
    }
}
