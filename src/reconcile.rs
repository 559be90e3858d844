//! Reconciliation between GPS-integrated and odometer distance.
//!
//! The odometer is the better measurement when it is sane: GPS integration
//! cuts corners between sparse fixes and adds jitter. A large disagreement
//! means one of them is wrong and we cannot tell which, so the two are
//! blended.

use std::borrow::Borrow;

use log::debug;

use crate::geo_utils::odometer_distance_km;
use crate::{DeviceStandard, DistanceSource, PositionPoint, TripDetectionConfig};

/// A trip distance together with the measurement it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconciledDistance {
    /// Distance in kilometers (unrounded)
    pub distance_km: f64,
    pub source: DistanceSource,
}

/// Odometer distance over a window, if the device can supply one.
///
/// Requires a Standard B device, odometer readings on both the first and the
/// last sample, and a positive delta between them.
pub fn window_odometer_km<P: Borrow<PositionPoint>>(
    window: &[P],
    standard: DeviceStandard,
) -> Option<f64> {
    if standard != DeviceStandard::B {
        return None;
    }
    let first: &PositionPoint = window.first()?.borrow();
    let last: &PositionPoint = window.last()?.borrow();
    let (start, end) = (first.attributes.odometer?, last.attributes.odometer?);
    if end > start {
        Some(odometer_distance_km(start, end))
    } else {
        None
    }
}

/// Pick the trip distance from the GPS distance and an optional odometer distance.
///
/// - Odometer within `odometer_trust_ratio` of a non-zero GPS distance: odometer.
/// - Otherwise, a positive odometer distance: weighted blend (`hybrid`).
/// - Otherwise: GPS.
pub fn reconcile_distance(
    gps_km: f64,
    odometer_km: Option<f64>,
    config: &TripDetectionConfig,
) -> ReconciledDistance {
    let Some(odo_km) = odometer_km else {
        return ReconciledDistance {
            distance_km: gps_km,
            source: DistanceSource::Gps,
        };
    };

    if gps_km > 0.0 && (odo_km - gps_km).abs() / gps_km < config.odometer_trust_ratio {
        debug!(
            "[Reconcile] Odometer {:.3}km agrees with GPS {:.3}km",
            odo_km, gps_km
        );
        return ReconciledDistance {
            distance_km: odo_km,
            source: DistanceSource::Odometer,
        };
    }

    if odo_km > 0.0 {
        let weight = config.hybrid_odometer_weight;
        let blended = weight * odo_km + (1.0 - weight) * gps_km;
        debug!(
            "[Reconcile] Odometer {:.3}km disagrees with GPS {:.3}km, using hybrid {:.3}km",
            odo_km, gps_km, blended
        );
        return ReconciledDistance {
            distance_km: blended,
            source: DistanceSource::Hybrid,
        };
    }

    ReconciledDistance {
        distance_km: gps_km,
        source: DistanceSource::Gps,
    }
}
