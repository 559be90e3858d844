//! # Trip Segmentation
//!
//! Partitions a drift-filtered, time-ordered sequence into candidate trip
//! windows with a stop-timeout rule.
//!
//! ## Algorithm
//! Single pass, two states (no window open / window open), remembering the
//! time of the last moving sample:
//! 1. Moving sample, no window: open a window here.
//! 2. Moving sample, window open: if the silence since the last moving sample
//!    exceeds the stop timeout, close the window and open a new one here.
//!    Otherwise extend the window.
//! 3. Stationary sample, window open: append it (the stop/tail of the trip),
//!    then close the window if the silence since the last movement exceeds
//!    the stop timeout.
//! 4. Stationary sample, no window: ignored.
//! 5. A window still open at the end is closed (trip in progress at the end
//!    of the data).
//!
//! Windows with fewer than two samples are never emitted.

use std::borrow::Borrow;
use std::ops::Range;

use chrono::{DateTime, Utc};
use log::debug;

use crate::movement::is_moving;
use crate::{DeviceStandard, PositionPoint, TripDetectionConfig};

/// Whether more than the stop timeout has passed since the last movement.
pub(crate) fn stop_timeout_exceeded(
    position: &PositionPoint,
    last_movement_at: Option<&DateTime<Utc>>,
    config: &TripDetectionConfig,
) -> bool {
    last_movement_at
        .map(|t| position.millis_since(t) as f64 > config.stop_timeout_ms())
        .unwrap_or(false)
}

fn close_window(windows: &mut Vec<Range<usize>>, window: Range<usize>) {
    if window.len() >= 2 {
        debug!("[Segmentation] Closed window {:?}", window);
        windows.push(window);
    } else {
        debug!(
            "[Segmentation] Dropped single-sample window at {}",
            window.start
        );
    }
}

/// Split positions into candidate trip windows.
///
/// Positions must already be sorted ascending by `recorded_at`; this is not
/// re-checked. Returned ranges index into `positions`, are contiguous, in
/// order, non-overlapping and at least two samples long.
pub fn segment_trips<P: Borrow<PositionPoint>>(
    positions: &[P],
    standard: DeviceStandard,
    config: &TripDetectionConfig,
) -> Vec<Range<usize>> {
    let mut windows = Vec::new();
    let mut window_start: Option<usize> = None;
    let mut last_movement_at: Option<DateTime<Utc>> = None;

    for (i, p) in positions.iter().enumerate() {
        let pos: &PositionPoint = p.borrow();

        if is_moving(pos, standard, config) {
            match window_start {
                Some(start) if stop_timeout_exceeded(pos, last_movement_at.as_ref(), config) => {
                    close_window(&mut windows, start..i);
                    window_start = Some(i);
                }
                Some(_) => {}
                None => window_start = Some(i),
            }
            last_movement_at = Some(pos.recorded_at);
        } else if let Some(start) = window_start {
            if stop_timeout_exceeded(pos, last_movement_at.as_ref(), config) {
                close_window(&mut windows, start..i + 1);
                window_start = None;
            }
        }
    }

    if let Some(start) = window_start {
        close_window(&mut windows, start..positions.len());
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PositionAttributes;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64, speed: f64) -> PositionPoint {
        let t = Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap() + Duration::seconds(secs);
        PositionPoint::new("car-1", t, 48.0 + secs as f64 * 0.0001, 11.0, speed)
    }

    #[test]
    fn test_no_movement_no_windows() {
        let positions: Vec<PositionPoint> = (0..10).map(|i| at(i * 30, 0.0)).collect();
        let windows = segment_trips(&positions, DeviceStandard::A, &TripDetectionConfig::default());
        assert!(windows.is_empty());
    }

    #[test]
    fn test_continuous_movement_single_window() {
        let positions: Vec<PositionPoint> = (0..10).map(|i| at(i * 30, 40.0)).collect();
        let windows = segment_trips(&positions, DeviceStandard::A, &TripDetectionConfig::default());
        assert_eq!(windows, vec![0..10]);
    }

    #[test]
    fn test_leading_stationary_samples_are_dropped() {
        let positions = vec![at(0, 0.0), at(30, 0.0), at(60, 20.0), at(90, 20.0)];
        let windows = segment_trips(&positions, DeviceStandard::A, &TripDetectionConfig::default());
        assert_eq!(windows, vec![2..4]);
    }

    #[test]
    fn test_long_gap_between_moving_samples_splits() {
        let positions = vec![
            at(0, 30.0),
            at(60, 30.0),
            at(120, 30.0),
            // 10 minutes of silence
            at(720, 30.0),
            at(780, 30.0),
        ];
        let windows = segment_trips(&positions, DeviceStandard::A, &TripDetectionConfig::default());
        assert_eq!(windows, vec![0..3, 3..5]);
    }

    #[test]
    fn test_stationary_tail_closes_window_after_timeout() {
        let positions = vec![
            at(0, 30.0),
            at(60, 30.0),
            at(120, 30.0),
            at(150, 0.0),
            at(200, 0.0),
            at(310, 0.0), // 190s after last movement
            at(400, 0.0),
        ];
        let windows = segment_trips(&positions, DeviceStandard::A, &TripDetectionConfig::default());
        assert_eq!(windows, vec![0..6]);
    }

    #[test]
    fn test_short_stop_stays_inside_trip() {
        let positions = vec![
            at(0, 30.0),
            at(60, 30.0),
            at(120, 0.0), // traffic light
            at(200, 0.0),
            at(240, 30.0),
            at(300, 30.0),
        ];
        let windows = segment_trips(&positions, DeviceStandard::A, &TripDetectionConfig::default());
        assert_eq!(windows, vec![0..6]);
    }

    #[test]
    fn test_single_sample_windows_are_not_emitted() {
        let positions = vec![at(0, 30.0), at(600, 30.0), at(1200, 30.0)];
        let windows = segment_trips(&positions, DeviceStandard::A, &TripDetectionConfig::default());
        assert!(windows.is_empty());
    }

    #[test]
    fn test_standard_b_ignition_drives_segmentation() {
        let ignition = |secs: i64, on: bool| {
            at(secs, 0.0).with_attributes(PositionAttributes::with_ignition(on))
        };
        let positions = vec![
            ignition(0, true),
            ignition(60, true),
            ignition(120, true),
            ignition(180, false),
            ignition(400, false),
        ];
        let config = TripDetectionConfig::default();
        assert_eq!(segment_trips(&positions, DeviceStandard::B, &config), vec![0..5]);
        assert!(segment_trips(&positions, DeviceStandard::A, &config).is_empty());
    }

    #[test]
    fn test_accepts_borrowed_positions() {
        let positions: Vec<PositionPoint> = (0..4).map(|i| at(i * 30, 40.0)).collect();
        let refs: Vec<&PositionPoint> = positions.iter().collect();
        let windows = segment_trips(&refs, DeviceStandard::A, &TripDetectionConfig::default());
        assert_eq!(windows, vec![0..4]);
    }
}
