//! Unified error handling for the trip-detector library.
//!
//! Detection itself never fails: windows that do not qualify as trips are
//! dropped. These errors belong to the checked entry points that validate
//! input before detection, the streaming detector, and the JSON boundary.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Unified error type for trip-detector operations.
#[derive(Debug, Error)]
pub enum TripError {
    /// Position has a non-finite or out-of-range coordinate
    #[error("position {index} of device '{device_id}' has invalid coordinates ({lat}, {lon})")]
    InvalidCoordinates {
        index: usize,
        device_id: String,
        lat: f64,
        lon: f64,
    },
    /// Position has a non-finite or negative speed
    #[error("position {index} of device '{device_id}' has invalid speed {speed}")]
    InvalidSpeed {
        index: usize,
        device_id: String,
        speed: f64,
    },
    /// Position is earlier than the one before it
    #[error("position {index} at {recorded_at} is earlier than its predecessor at {previous}")]
    OutOfOrder {
        index: usize,
        recorded_at: DateTime<Utc>,
        previous: DateTime<Utc>,
    },
    /// Configuration threshold is unusable
    #[error("invalid configuration for '{field}': {message}")]
    InvalidConfig {
        field: &'static str,
        message: String,
    },
    /// Malformed JSON at the request boundary
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl TripError {
    pub(crate) fn invalid_config(field: &'static str, message: impl Into<String>) -> Self {
        TripError::InvalidConfig {
            field,
            message: message.into(),
        }
    }
}

/// Result type alias for trip-detector operations.
pub type Result<T> = std::result::Result<T, TripError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_error_display() {
        let err = TripError::InvalidCoordinates {
            index: 3,
            device_id: "car-1".to_string(),
            lat: f64::NAN,
            lon: 11.5,
        };
        assert!(err.to_string().contains("car-1"));
        assert!(err.to_string().contains("position 3"));

        let err = TripError::invalid_config("min_speed_kmh", "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid configuration for 'min_speed_kmh': must be positive"
        );
    }

    #[test]
    fn test_out_of_order_display() {
        let previous = Utc.with_ymd_and_hms(2024, 3, 4, 8, 1, 0).unwrap();
        let err = TripError::OutOfOrder {
            index: 1,
            recorded_at: Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap(),
            previous,
        };
        assert!(err.to_string().contains("earlier than its predecessor"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: TripError = parse.unwrap_err().into();
        assert!(matches!(err, TripError::Json(_)));
    }
}
