//! # Algorithm Toolbox
//!
//! This module provides direct access to every stage of trip detection.
//! Use these when integrating a single stage into your own pipeline
//! (for example drift-filtering positions before storing them) without
//! running full detection.
//!
//! ## Pipeline Stages
//!
//! - **Drift Filter**: Drop stationary GPS jitter
//! - **Movement Classifier**: Per-sample moving/stationary decision
//! - **Segmentation**: Stop-timeout split into candidate windows
//! - **Trip Building**: Admission checks and speed statistics
//! - **Distance Reconciliation**: Odometer vs GPS distance
//!
//! ## Geographic Utilities
//!
//! - **Haversine Distance**: Great-circle distance between GPS points
//! - **Polyline Length**: Total distance along a path
//! - **Odometer Distance**: Clamped odometer delta
//! - **Douglas-Peucker**: Track simplification for display
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use trip_detector::algorithms::{
//!     filter_gps_drift, segment_trips, build_trip,
//!     DeviceStandard, PositionPoint, TripDetectionConfig,
//! };
//!
//! let start = Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap();
//! let positions: Vec<PositionPoint> = (0..5)
//!     .map(|i| PositionPoint::new("car-1", start + Duration::minutes(i), 48.0 + i as f64 * 0.004, 11.0, 30.0))
//!     .collect();
//!
//! let config = TripDetectionConfig::default();
//! let kept = filter_gps_drift(&positions, config.gps_drift_radius_m, config.min_speed_kmh);
//! let windows = segment_trips(&kept, DeviceStandard::A, &config);
//! let trip = build_trip(&kept[windows[0].clone()], DeviceStandard::A, &config);
//! assert!(trip.is_some());
//! ```

// =============================================================================
// Core Types (re-exported from lib)
// =============================================================================

pub use crate::{
    DeviceStandard, DistanceSource, GpsPoint, PositionAttributes, PositionPoint,
    TripDetectionConfig, TripResult,
};

// =============================================================================
// Geographic Utilities
// =============================================================================

pub use crate::geo_utils::{
    gps_distance_km, haversine_distance, odometer_distance_km, polyline_length, simplify_track,
    EARTH_RADIUS_M,
};

// =============================================================================
// Pipeline Stages
// =============================================================================

/// Remove drift samples, comparing each sample with the last kept one.
pub use crate::drift::filter_gps_drift;

/// Single drift decision (used by the streaming detector).
pub use crate::drift::is_significant;

/// Per-sample movement classification.
///
/// Standard B with ignition: ignition decides. Otherwise: speed threshold.
pub use crate::movement::is_moving;

/// Split a filtered sequence into candidate trip windows.
pub use crate::segmentation::segment_trips;

/// Validate and finalize one candidate window.
pub use crate::trip::build_trip;

/// Builder applied to an already-bounded trip.
pub use crate::trip::compute_trip_summary;

/// Simplified polyline of a trip.
pub use crate::trip::trip_track;

// =============================================================================
// Distance Reconciliation
// =============================================================================

/// Combine GPS and odometer distance into one trusted value.
pub use crate::reconcile::reconcile_distance;

/// Odometer distance over a window, when the device supplies one.
pub use crate::reconcile::window_odometer_km;

/// Reconciled distance with its source tag.
pub use crate::reconcile::ReconciledDistance;
