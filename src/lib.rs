//! # Trip Detector
//!
//! Reconstructs vehicle trips from raw positional telemetry for mileage
//! logbooks.
//!
//! This library provides:
//! - Haversine path integration and odometer deltas
//! - GPS drift suppression for stationary vehicles
//! - Movement classification for GPS-only (`A`) and ignition-equipped (`B`) devices
//! - Stop-timeout trip segmentation with odometer/GPS distance reconciliation
//! - An incremental detector for hosts that receive positions one at a time
//!
//! ## Features
//!
//! - **`parallel`** - Detect trips for many devices concurrently with rayon
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use trip_detector::{detect_trips, DeviceStandard, PositionPoint, TripDetectionConfig};
//!
//! let start = Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap();
//! // One sample per minute, ~500m apart, heading north at ~30 km/h
//! let positions: Vec<PositionPoint> = (0..6)
//!     .map(|i| {
//!         PositionPoint::new(
//!             "car-1",
//!             start + Duration::minutes(i),
//!             48.1374 + i as f64 * 0.0045,
//!             11.5755,
//!             30.0,
//!         )
//!     })
//!     .collect();
//!
//! let trips = detect_trips(&positions, DeviceStandard::A, &TripDetectionConfig::default());
//! assert_eq!(trips.len(), 1);
//! println!("{:.2} km ({})", trips[0].distance_km, trips[0].distance_source);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, TripError};

// Geographic utilities (haversine, path length, odometer delta)
pub mod geo_utils;

// Algorithm toolbox - standalone access to every pipeline stage
pub mod algorithms;

// Pipeline stages
pub mod drift;
pub use drift::filter_gps_drift;

pub mod movement;
pub use movement::is_moving;

pub mod reconcile;
pub use reconcile::{reconcile_distance, ReconciledDistance};

pub mod segmentation;
pub use segmentation::segment_trips;

pub mod trip;
pub use trip::{build_trip, compute_trip_summary, trip_track};

pub mod detection;
#[cfg(feature = "parallel")]
pub use detection::detect_trips_batch_parallel;
pub use detection::{
    detect_trips, detect_trips_batch, detect_trips_checked, validate_positions, DetectionRun,
    DeviceBatch,
};

// Incremental detection for hosts that receive one position at a time
pub mod streaming;
pub use streaming::{TripDetectionState, TripDetector, TripState};

// Provider record normalization and ordering helpers
pub mod normalize;
pub use normalize::{group_by_device, knots_to_kmh, sort_positions, ProviderPosition};

// JSON entry points for request handlers
pub mod json;
pub use json::detect_trips_json;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use trip_detector::GpsPoint;
/// let point = GpsPoint::new(48.1374, 11.5755); // Munich
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Open attribute bag reported alongside a position.
///
/// Only a few keys carry meaning for trip detection; everything else a
/// provider sends is kept in `extra` untouched. Known keys are read
/// leniently: a value of an unexpected type never fails the position, it
/// just carries no reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionAttributes {
    /// Ignition state (authoritative for Standard B devices).
    /// `None` only when the key is absent; a present value other than
    /// `true` (including `null`) reads as off.
    #[serde(
        default,
        deserialize_with = "attribute::ignition",
        skip_serializing_if = "Option::is_none"
    )]
    pub ignition: Option<bool>,
    /// Device-reported motion flag
    #[serde(
        default,
        deserialize_with = "attribute::boolean",
        skip_serializing_if = "Option::is_none"
    )]
    pub motion: Option<bool>,
    /// Odometer reading in meters (numeric values only)
    #[serde(
        default,
        deserialize_with = "attribute::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub odometer: Option<f64>,
    /// Provider event, numeric codes kept as their decimal text
    #[serde(
        default,
        deserialize_with = "attribute::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub event: Option<String>,
    /// Battery level (percent or volts, provider dependent)
    #[serde(
        default,
        alias = "batteryLevel",
        deserialize_with = "attribute::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub battery_level: Option<f64>,
    /// Any other provider-specific fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Lenient readers for the known attribute keys.
///
/// Each is only invoked when the key is present; absent keys take the
/// field default.
mod attribute {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn ignition<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(Some(matches!(Value::deserialize(d)?, Value::Bool(true))))
    }

    pub fn boolean<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(Value::deserialize(d)?.as_bool())
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(Value::deserialize(d)?.as_f64().filter(|v| v.is_finite()))
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }
}

impl PositionAttributes {
    /// Attributes carrying only an ignition state.
    pub fn with_ignition(ignition: bool) -> Self {
        Self {
            ignition: Some(ignition),
            ..Self::default()
        }
    }

    /// Set the odometer reading (meters).
    pub fn odometer(mut self, meters: f64) -> Self {
        self.odometer = Some(meters);
        self
    }
}

/// One telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionPoint {
    pub device_id: String,
    /// Fix time (ISO-8601 on the wire)
    pub recorded_at: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    /// Speed in km/h
    pub speed: f64,
    /// Heading in degrees
    #[serde(default)]
    pub course: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub attributes: PositionAttributes,
}

impl PositionPoint {
    /// Create a position with no course, altitude, accuracy or attributes.
    pub fn new(
        device_id: impl Into<String>,
        recorded_at: DateTime<Utc>,
        lat: f64,
        lon: f64,
        speed: f64,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            recorded_at,
            lat,
            lon,
            speed,
            course: 0.0,
            altitude: None,
            accuracy: None,
            attributes: PositionAttributes::default(),
        }
    }

    /// Replace the attribute bag.
    pub fn with_attributes(mut self, attributes: PositionAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Coordinates of this sample.
    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.lat, self.lon)
    }

    /// Milliseconds from `earlier` to this sample (negative if out of order).
    pub fn millis_since(&self, earlier: &DateTime<Utc>) -> i64 {
        (self.recorded_at - *earlier).num_milliseconds()
    }
}

/// Telemetry capability class of a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceStandard {
    /// GPS only: movement inferred from speed
    #[default]
    A,
    /// Ignition signal, optionally with odometer readings
    B,
}

/// Which distance measurement a trip reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceSource {
    Gps,
    Odometer,
    Hybrid,
}

impl DistanceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceSource::Gps => "gps",
            DistanceSource::Odometer => "odometer",
            DistanceSource::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for DistanceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logbook classification of a trip.
///
/// Assigned by users downstream; detection always leaves trips unclassified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripClassification {
    Business,
    Private,
    Commute,
    #[default]
    Unclassified,
}

impl TripClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripClassification::Business => "business",
            TripClassification::Private => "private",
            TripClassification::Commute => "commute",
            TripClassification::Unclassified => "unclassified",
        }
    }
}

/// Configuration for trip detection.
///
/// All fields default individually when deserialized, so a fleet or device
/// override only needs the thresholds it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripDetectionConfig {
    /// Minimum movement distance to start a trip (meters).
    /// Not consulted by segmentation; kept for host-side start gating.
    /// Default: 50.0
    pub min_movement_distance_m: f64,

    /// Silence after the last moving sample before a trip is considered ended (seconds).
    /// Default: 180.0
    pub stop_timeout_sec: f64,

    /// Radius within which a slow sample is treated as GPS drift (meters).
    /// Default: 15.0
    pub gps_drift_radius_m: f64,

    /// Minimum speed counted as moving (km/h).
    /// Default: 3.0
    pub min_speed_kmh: f64,

    /// Minimum reported distance for a valid trip (meters).
    /// Default: 100.0
    pub min_trip_distance_m: f64,

    /// Minimum duration for a valid trip (seconds).
    /// Default: 60.0
    pub min_trip_duration_sec: f64,

    /// Relative odometer/GPS disagreement below which the odometer is trusted.
    /// Default: 0.30
    pub odometer_trust_ratio: f64,

    /// Odometer weight in the hybrid blend (0.5 = arithmetic mean).
    /// Default: 0.5
    pub hybrid_odometer_weight: f64,
}

impl Default for TripDetectionConfig {
    fn default() -> Self {
        Self {
            min_movement_distance_m: 50.0,
            stop_timeout_sec: 180.0,  // 3 min - traffic lights and short stops stay inside a trip
            gps_drift_radius_m: 15.0, // typical urban multipath jitter
            min_speed_kmh: 3.0,
            min_trip_distance_m: 100.0,
            min_trip_duration_sec: 60.0,
            odometer_trust_ratio: 0.30,
            hybrid_odometer_weight: 0.5,
        }
    }
}

impl TripDetectionConfig {
    /// Check that every threshold is usable.
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("min_movement_distance_m", self.min_movement_distance_m),
            ("stop_timeout_sec", self.stop_timeout_sec),
            ("gps_drift_radius_m", self.gps_drift_radius_m),
            ("min_speed_kmh", self.min_speed_kmh),
            ("min_trip_distance_m", self.min_trip_distance_m),
            ("min_trip_duration_sec", self.min_trip_duration_sec),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(TripError::invalid_config(
                    field,
                    format!("must be a finite, non-negative number (got {})", value),
                ));
            }
        }

        if !self.odometer_trust_ratio.is_finite() || self.odometer_trust_ratio <= 0.0 {
            return Err(TripError::invalid_config(
                "odometer_trust_ratio",
                format!("must be greater than zero (got {})", self.odometer_trust_ratio),
            ));
        }

        if !(0.0..=1.0).contains(&self.hybrid_odometer_weight) {
            return Err(TripError::invalid_config(
                "hybrid_odometer_weight",
                format!("must be within [0, 1] (got {})", self.hybrid_odometer_weight),
            ));
        }

        Ok(())
    }

    /// Stop timeout in milliseconds, for comparing against timestamp gaps.
    pub(crate) fn stop_timeout_ms(&self) -> f64 {
        self.stop_timeout_sec * 1000.0
    }
}

/// A detected trip, ready to be stored in a logbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripResult {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub start_lat: f64,
    pub start_lon: f64,
    pub end_lat: f64,
    pub end_lon: f64,
    /// Trip distance in kilometers (2 decimals)
    pub distance_km: f64,
    /// Measurement the distance came from
    pub distance_source: DistanceSource,
    /// Number of samples in the trip window
    pub positions_count: u32,
    /// Highest sampled speed in km/h (1 decimal)
    pub max_speed_kmh: f64,
    /// Distance over elapsed time in km/h (1 decimal)
    pub avg_speed_kmh: f64,
}

impl TripResult {
    /// Elapsed time between the first and last sample, in seconds.
    pub fn duration_sec(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

// ============================================================================
// Tests
// ============================================================================
