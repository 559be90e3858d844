//! JSON entry points for request handlers and batch jobs that exchange
//! positions and trips as JSON text.

use log::info;

use crate::detection::detect_trips_checked;
use crate::error::Result;
use crate::{DeviceStandard, PositionPoint, TripDetectionConfig};

/// Parse a config override; missing fields keep their defaults.
pub fn parse_config(config_json: Option<&str>) -> Result<TripDetectionConfig> {
    match config_json {
        Some(json) if !json.trim().is_empty() => Ok(serde_json::from_str(json)?),
        _ => Ok(TripDetectionConfig::default()),
    }
}

/// Detect trips from a JSON array of positions.
///
/// Input and configuration are validated before detection; the result is a
/// JSON array of trips.
///
/// # Example
/// ```
/// use trip_detector::{detect_trips_json, DeviceStandard};
///
/// let positions = r#"[
///     {"device_id": "car-1", "recorded_at": "2024-03-04T08:00:00Z", "lat": 48.000, "lon": 11.0, "speed": 30},
///     {"device_id": "car-1", "recorded_at": "2024-03-04T08:01:00Z", "lat": 48.004, "lon": 11.0, "speed": 30},
///     {"device_id": "car-1", "recorded_at": "2024-03-04T08:02:00Z", "lat": 48.008, "lon": 11.0, "speed": 30}
/// ]"#;
/// let trips = detect_trips_json(positions, DeviceStandard::A, None).unwrap();
/// assert!(trips.contains("\"distance_source\":\"gps\""));
/// ```
pub fn detect_trips_json(
    positions_json: &str,
    standard: DeviceStandard,
    config_json: Option<&str>,
) -> Result<String> {
    let positions: Vec<PositionPoint> = serde_json::from_str(positions_json)?;
    let config = parse_config(config_json)?;

    let trips = detect_trips_checked(&positions, standard, &config)?;
    info!(
        "[TripDetection] JSON request: {} positions -> {} trips",
        positions.len(),
        trips.len()
    );

    Ok(serde_json::to_string(&trips)?)
}
