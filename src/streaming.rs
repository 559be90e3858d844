//! # Incremental Trip Detection
//!
//! For hosts that receive positions one at a time (polling jobs, webhooks).
//! Each pushed sample runs exactly one iteration of the batch pipeline: the
//! drift check against the last kept sample, then one segmentation step.
//! What the batch loop keeps in local variables lives in
//! [`TripDetectionState`], which the host can serialize between calls.
//!
//! Feeding a sorted sequence through [`TripDetector::push`] followed by
//! [`TripDetector::finish`] yields the same trips as
//! [`detect_trips`](crate::detect_trips) on that sequence.
//!
//! The state is mutated read-then-write on every call, so updates for one
//! device must be serialized by the host. Different devices are independent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::drift::is_significant;
use crate::error::{Result, TripError};
use crate::movement::is_moving;
use crate::segmentation::stop_timeout_exceeded;
use crate::trip::build_trip;
use crate::{DeviceStandard, PositionPoint, TripDetectionConfig, TripResult};

/// Where the vehicle is in its trip lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripState {
    /// No trip in progress
    #[default]
    Idle,
    /// Trip in progress, last kept sample was moving
    Moving,
    /// Trip in progress, vehicle stationary but not yet past the stop timeout
    Stopping,
}

/// Detection state carried across calls for one device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripDetectionState {
    pub state: TripState,
    /// Samples of the trip in progress (empty when idle)
    pub current_trip_positions: Vec<PositionPoint>,
    /// Time of the last moving sample
    pub last_movement_at: Option<DateTime<Utc>>,
    /// Last sample seen, kept or not
    pub last_position: Option<PositionPoint>,
    /// Last sample kept by the drift filter
    pub last_retained: Option<PositionPoint>,
    /// Number of samples accepted so far
    pub samples_seen: usize,
}

/// Stateful, per-device trip detector.
#[derive(Debug, Clone)]
pub struct TripDetector {
    standard: DeviceStandard,
    config: TripDetectionConfig,
    state: TripDetectionState,
}

impl TripDetector {
    /// Create a detector with empty state.
    pub fn new(standard: DeviceStandard, config: TripDetectionConfig) -> Self {
        Self::from_state(standard, config, TripDetectionState::default())
    }

    /// Resume from a previously saved state.
    pub fn from_state(
        standard: DeviceStandard,
        config: TripDetectionConfig,
        state: TripDetectionState,
    ) -> Self {
        Self {
            standard,
            config,
            state,
        }
    }

    pub fn state(&self) -> &TripDetectionState {
        &self.state
    }

    /// Consume the detector, returning its state for persistence.
    pub fn into_state(self) -> TripDetectionState {
        self.state
    }

    pub fn trip_state(&self) -> TripState {
        self.state.state
    }

    /// Feed the next sample.
    ///
    /// Returns a trip when this sample closes one that passes the admission
    /// checks. A sample earlier than the previous one is refused with
    /// [`TripError::OutOfOrder`] and leaves the state untouched.
    pub fn push(&mut self, position: PositionPoint) -> Result<Option<TripResult>> {
        if let Some(last) = &self.state.last_position {
            if position.recorded_at < last.recorded_at {
                return Err(TripError::OutOfOrder {
                    index: self.state.samples_seen,
                    recorded_at: position.recorded_at,
                    previous: last.recorded_at,
                });
            }
        }

        let keep = match &self.state.last_retained {
            Some(last) => is_significant(
                last,
                &position,
                self.config.gps_drift_radius_m,
                self.config.min_speed_kmh,
            ),
            None => true,
        };

        self.state.samples_seen += 1;
        self.state.last_position = Some(position.clone());
        if !keep {
            return Ok(None);
        }
        self.state.last_retained = Some(position.clone());

        Ok(self.advance(position))
    }

    /// Feed several samples, collecting every trip they close.
    pub fn push_all<I>(&mut self, positions: I) -> Result<Vec<TripResult>>
    where
        I: IntoIterator<Item = PositionPoint>,
    {
        let mut trips = Vec::new();
        for position in positions {
            if let Some(trip) = self.push(position)? {
                trips.push(trip);
            }
        }
        Ok(trips)
    }

    /// Close the trip in progress at the end of the available data.
    pub fn finish(&mut self) -> Option<TripResult> {
        self.state.state = TripState::Idle;
        self.take_trip()
    }

    /// Statistics of the trip in progress, without closing it.
    pub fn provisional_trip(&self) -> Option<TripResult> {
        build_trip(&self.state.current_trip_positions, self.standard, &self.config)
    }

    fn advance(&mut self, position: PositionPoint) -> Option<TripResult> {
        let moving = is_moving(&position, self.standard, &self.config);
        let timed_out =
            stop_timeout_exceeded(&position, self.state.last_movement_at.as_ref(), &self.config);
        let trip_open = !self.state.current_trip_positions.is_empty();

        if moving {
            let closed = if trip_open && timed_out {
                self.take_trip()
            } else {
                None
            };
            self.state.last_movement_at = Some(position.recorded_at);
            self.state.current_trip_positions.push(position);
            self.state.state = TripState::Moving;
            closed
        } else if trip_open {
            self.state.current_trip_positions.push(position);
            if timed_out {
                self.state.state = TripState::Idle;
                self.take_trip()
            } else {
                self.state.state = TripState::Stopping;
                None
            }
        } else {
            None
        }
    }

    fn take_trip(&mut self) -> Option<TripResult> {
        let window = std::mem::take(&mut self.state.current_trip_positions);
        build_trip(&window, self.standard, &self.config)
    }
}
