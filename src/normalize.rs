//! Helpers for the ingestion side of detection: converting provider
//! records into [`PositionPoint`]s and putting them in the order the engine
//! expects. Nothing here performs I/O.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo_utils::round_to;
use crate::{PositionAttributes, PositionPoint};

/// Kilometers per hour in one knot.
pub const KMH_PER_KNOT: f64 = 1.852;

/// Convert a speed in knots to km/h, rounded to 2 decimals.
pub fn knots_to_kmh(knots: f64) -> f64 {
    round_to(knots * KMH_PER_KNOT, 2)
}

/// A position as reported by a Traccar-style telematics server.
///
/// Speeds are in knots, field names are camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPosition {
    /// Provider-side position id
    #[serde(default)]
    pub id: Option<i64>,
    /// Provider-side device id
    #[serde(default)]
    pub device_id: Option<i64>,
    pub fix_time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Speed in knots
    pub speed: f64,
    #[serde(default)]
    pub course: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub attributes: PositionAttributes,
}

impl ProviderPosition {
    /// Convert into an engine position for the given internal device id.
    pub fn normalize(&self, device_id: &str) -> PositionPoint {
        PositionPoint {
            device_id: device_id.to_string(),
            recorded_at: self.fix_time,
            lat: self.latitude,
            lon: self.longitude,
            speed: knots_to_kmh(self.speed),
            course: self.course,
            altitude: self.altitude,
            accuracy: self.accuracy,
            attributes: self.attributes.clone(),
        }
    }
}

/// Sort positions ascending by `recorded_at`.
///
/// Stable: samples with equal timestamps keep their arrival order.
pub fn sort_positions(positions: &mut [PositionPoint]) {
    positions.sort_by_key(|p| p.recorded_at);
}

/// Split a mixed stream into per-device sequences, each sorted by time.
pub fn group_by_device<I>(positions: I) -> BTreeMap<String, Vec<PositionPoint>>
where
    I: IntoIterator<Item = PositionPoint>,
{
    let mut by_device: BTreeMap<String, Vec<PositionPoint>> = BTreeMap::new();
    for pos in positions {
        by_device.entry(pos.device_id.clone()).or_default().push(pos);
    }
    for track in by_device.values_mut() {
        sort_positions(track);
    }
    by_device
}
