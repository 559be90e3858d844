//! # Trip Detection
//!
//! The full batch pipeline:
//!
//! raw positions → drift filter → segmentation (movement classified per
//! sample) → trip building (distance reconciled per window) → trips
//!
//! Detection is pure: no I/O, no shared state, input is never mutated.
//! Calls for different devices can run concurrently without coordination.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::drift::filter_gps_drift;
use crate::error::{Result, TripError};
use crate::segmentation::segment_trips;
use crate::trip::build_trip;
use crate::{DeviceStandard, PositionPoint, TripDetectionConfig, TripResult};

/// Detect trips in a time-ordered position sequence.
///
/// Positions must be sorted ascending by `recorded_at`; the engine does not
/// sort, and unsorted input silently produces wrong segmentation. Fewer than
/// two positions, or fewer than two after drift filtering, yield no trips.
pub fn detect_trips(
    positions: &[PositionPoint],
    standard: DeviceStandard,
    config: &TripDetectionConfig,
) -> Vec<TripResult> {
    if positions.len() < 2 {
        return vec![];
    }

    let filtered = filter_gps_drift(positions, config.gps_drift_radius_m, config.min_speed_kmh);
    if filtered.len() < 2 {
        debug!(
            "[TripDetection] {} positions collapsed to {} after drift filtering",
            positions.len(),
            filtered.len()
        );
        return vec![];
    }

    let windows = segment_trips(&filtered, standard, config);
    let trips: Vec<TripResult> = windows
        .iter()
        .filter_map(|window| build_trip(&filtered[window.clone()], standard, config))
        .collect();

    info!(
        "[TripDetection] {} positions, {} after drift filter, {} windows, {} trips ({:?})",
        positions.len(),
        filtered.len(),
        windows.len(),
        trips.len(),
        standard
    );

    trips
}

/// Check positions for values detection would silently mis-handle.
///
/// Rejects non-finite or out-of-range coordinates, non-finite or negative
/// speeds, and timestamps that go backwards. Equal timestamps are allowed.
pub fn validate_positions(positions: &[PositionPoint]) -> Result<()> {
    for (index, pos) in positions.iter().enumerate() {
        if !pos.point().is_valid() {
            return Err(TripError::InvalidCoordinates {
                index,
                device_id: pos.device_id.clone(),
                lat: pos.lat,
                lon: pos.lon,
            });
        }

        if !pos.speed.is_finite() || pos.speed < 0.0 {
            return Err(TripError::InvalidSpeed {
                index,
                device_id: pos.device_id.clone(),
                speed: pos.speed,
            });
        }

        if let Some(prev) = index.checked_sub(1).map(|i| &positions[i]) {
            if pos.recorded_at < prev.recorded_at {
                return Err(TripError::OutOfOrder {
                    index,
                    recorded_at: pos.recorded_at,
                    previous: prev.recorded_at,
                });
            }
        }
    }
    Ok(())
}

/// Validate configuration and positions, then detect trips.
pub fn detect_trips_checked(
    positions: &[PositionPoint],
    standard: DeviceStandard,
    config: &TripDetectionConfig,
) -> Result<Vec<TripResult>> {
    config.validate()?;
    validate_positions(positions)?;
    Ok(detect_trips(positions, standard, config))
}

// ============================================================================
// Per-device Batches
// ============================================================================

/// Positions of one device, ready for detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceBatch {
    pub device_id: String,
    pub standard: DeviceStandard,
    /// Sorted ascending by `recorded_at`
    pub positions: Vec<PositionPoint>,
}

/// Outcome of detecting trips for one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRun {
    pub device_id: String,
    /// Number of positions the run was given
    pub positions_ingested: u32,
    pub trips: Vec<TripResult>,
}

impl DetectionRun {
    pub fn trips_created(&self) -> u32 {
        u32::try_from(self.trips.len()).unwrap_or(u32::MAX)
    }
}

fn run_batch(batch: &DeviceBatch, config: &TripDetectionConfig) -> DetectionRun {
    DetectionRun {
        device_id: batch.device_id.clone(),
        positions_ingested: u32::try_from(batch.positions.len()).unwrap_or(u32::MAX),
        trips: detect_trips(&batch.positions, batch.standard, config),
    }
}

/// Detect trips for several devices, one run per batch in input order.
pub fn detect_trips_batch(batches: &[DeviceBatch], config: &TripDetectionConfig) -> Vec<DetectionRun> {
    batches.iter().map(|batch| run_batch(batch, config)).collect()
}

/// Parallel version of [`detect_trips_batch`].
///
/// Devices are independent, so batches are processed on all available
/// cores. Results keep input order.
#[cfg(feature = "parallel")]
pub fn detect_trips_batch_parallel(
    batches: &[DeviceBatch],
    config: &TripDetectionConfig,
) -> Vec<DetectionRun> {
    use rayon::prelude::*;

    let start = std::time::Instant::now();
    let runs: Vec<DetectionRun> = batches
        .par_iter()
        .map(|batch| run_batch(batch, config))
        .collect();

    info!(
        "[TripDetection] Processed {} devices in parallel in {}ms",
        batches.len(),
        start.elapsed().as_millis()
    );
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn moving_track(device: &str, samples: i64) -> Vec<PositionPoint> {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap();
        (0..samples)
            .map(|i| {
                PositionPoint::new(
                    device,
                    start + Duration::seconds(i * 60),
                    48.0 + i as f64 * 0.004,
                    11.0,
                    30.0,
                )
            })
            .collect()
    }

    #[test]
    fn test_fewer_than_two_positions() {
        let config = TripDetectionConfig::default();
        assert!(detect_trips(&[], DeviceStandard::A, &config).is_empty());
        let one = moving_track("car-1", 1);
        assert!(detect_trips(&one, DeviceStandard::A, &config).is_empty());
    }

    #[test]
    fn test_detects_single_trip() {
        let positions = moving_track("car-1", 8);
        let trips = detect_trips(&positions, DeviceStandard::A, &TripDetectionConfig::default());
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].positions_count, 8);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let positions = moving_track("car-1", 8);
        let copy = positions.clone();
        let _ = detect_trips(&positions, DeviceStandard::A, &TripDetectionConfig::default());
        assert_eq!(positions, copy);
    }

    #[test]
    fn test_validate_positions() {
        let mut positions = moving_track("car-1", 4);
        assert!(validate_positions(&positions).is_ok());

        positions[2].lat = f64::NAN;
        assert!(matches!(
            validate_positions(&positions),
            Err(TripError::InvalidCoordinates { index: 2, .. })
        ));

        let mut positions = moving_track("car-1", 4);
        positions[1].speed = -1.0;
        assert!(matches!(
            validate_positions(&positions),
            Err(TripError::InvalidSpeed { index: 1, .. })
        ));

        let mut positions = moving_track("car-1", 4);
        positions.swap(1, 2);
        assert!(matches!(
            validate_positions(&positions),
            Err(TripError::OutOfOrder { index: 2, .. })
        ));
    }

    #[test]
    fn test_detect_trips_checked() {
        let positions = moving_track("car-1", 8);
        let config = TripDetectionConfig::default();
        assert_eq!(
            detect_trips_checked(&positions, DeviceStandard::A, &config).unwrap(),
            detect_trips(&positions, DeviceStandard::A, &config)
        );

        let bad_config = TripDetectionConfig {
            min_speed_kmh: f64::INFINITY,
            ..TripDetectionConfig::default()
        };
        assert!(detect_trips_checked(&positions, DeviceStandard::A, &bad_config).is_err());
    }

    #[test]
    fn test_detect_trips_batch() {
        let batches = vec![
            DeviceBatch {
                device_id: "car-1".to_string(),
                standard: DeviceStandard::A,
                positions: moving_track("car-1", 8),
            },
            DeviceBatch {
                device_id: "car-2".to_string(),
                standard: DeviceStandard::B,
                positions: vec![],
            },
        ];
        let runs = detect_trips_batch(&batches, &TripDetectionConfig::default());
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].device_id, "car-1");
        assert_eq!(runs[0].positions_ingested, 8);
        assert_eq!(runs[0].trips_created(), 1);
        assert_eq!(runs[1].trips_created(), 0);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_batch_matches_sequential() {
        let batches: Vec<DeviceBatch> = (0..16)
            .map(|i| {
                let id = format!("car-{}", i);
                DeviceBatch {
                    positions: moving_track(&id, 4 + i),
                    device_id: id,
                    standard: DeviceStandard::A,
                }
            })
            .collect();
        let config = TripDetectionConfig::default();
        assert_eq!(
            detect_trips_batch_parallel(&batches, &config),
            detect_trips_batch(&batches, &config)
        );
    }
}
