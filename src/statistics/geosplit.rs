//! Per-leg GPS estimates.
//!
//! The resampled track has one point per second, so a leg's elapsed window
//! shifted by the course-start offset is directly a slice of track points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::types::Seconds;
use crate::parsing::gpx::InterpolatedTrack;
use crate::utils::geodesy::{haversine_distance, positive_elevation_gain};

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Course start is {offset} s from the track start, outside its {duration} s")]
    StartOutsideTrack { offset: i64, duration: u32 },
}

/// Distance and climb of one leg, in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLegStatistics {
    /// Straight-line distance from the first to the last point of the leg
    pub length_m: f64,
    /// Distance along the track
    pub path_m: f64,
    pub elevation_gain_m: f64,
}

/// Maps leg windows onto a track recorded from before the course start
#[derive(Debug, Clone, Copy)]
pub struct GeoSplitEstimator<'a> {
    track: &'a InterpolatedTrack,
    /// Track index of the course start
    offset: usize,
}

impl<'a> GeoSplitEstimator<'a> {
    /// # Errors
    ///
    /// Returns `GeoError::StartOutsideTrack` if `course_start` is before the
    /// first or after the last second of the track.
    pub fn new(track: &'a InterpolatedTrack, course_start: DateTime<Utc>) -> Result<Self, GeoError> {
        let duration = track.summary.duration_s;
        let offset = (course_start - track.start).num_seconds();
        let outside = GeoError::StartOutsideTrack { offset, duration };
        if offset < 0 || offset > i64::from(duration) {
            return Err(outside);
        }
        let offset = usize::try_from(offset).map_err(|_| outside)?;
        Ok(Self { track, offset })
    }

    /// Estimate one leg. `None` when the leg ends after the track does.
    #[must_use]
    pub fn leg(&self, (start, end): (Seconds, Seconds)) -> Option<GeoLegStatistics> {
        let first = self.offset + start as usize;
        let last = self.offset + end as usize;
        let points = self.track.points.get(first..=last)?;
        let (a, b) = (points.first()?, points.last()?);

        Some(GeoLegStatistics {
            length_m: haversine_distance(a.lat, a.lon, b.lat, b.lon),
            path_m: points
                .windows(2)
                .map(|w| haversine_distance(w[0].lat, w[0].lon, w[1].lat, w[1].lon))
                .sum(),
            elevation_gain_m: positive_elevation_gain(points.iter().map(|p| p.ele)),
        })
    }

    /// Estimate every placed leg, aligned with `windows`
    #[must_use]
    pub fn estimate(&self, windows: &[Option<(Seconds, Seconds)>]) -> Vec<Option<GeoLegStatistics>> {
        let estimates: Vec<_> = windows
            .iter()
            .map(|window| window.and_then(|w| self.leg(w)))
            .collect();
        debug!(
            legs = windows.len(),
            estimated = estimates.iter().flatten().count(),
            "Estimated legs from track"
        );
        estimates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::gpx::{TrackPoint, TrackSummary};
    use chrono::TimeZone;
    use geo::{Coord, Rect};

    /// Straight north at ~1.1 m/s, climbing 1 m every 10 s
    fn track(seconds: u32) -> InterpolatedTrack {
        let points: Vec<TrackPoint> = (0..=seconds)
            .map(|k| TrackPoint {
                lat: 55.0 + f64::from(k) * 0.00001,
                lon: 37.0,
                ele: f64::from(k / 10),
            })
            .collect();
        InterpolatedTrack {
            start: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            summary: TrackSummary {
                distance_m: 0.0,
                elevation_gain_m: 0.0,
                duration_s: seconds,
                start_point: points[0],
                bounds: Rect::new(Coord { x: 37.0, y: 55.0 }, Coord { x: 37.0, y: 56.0 }),
            },
            points,
        }
    }

    #[test]
    fn test_leg_estimate() {
        let track = track(600);
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 1, 0).unwrap();
        let estimator = GeoSplitEstimator::new(&track, start).unwrap();

        let leg = estimator.leg((0, 100)).unwrap();
        // 100 s * 0.00001 deg ~ 111 m
        assert!((leg.length_m - 111.2).abs() < 0.5, "got {}", leg.length_m);
        assert!(leg.length_m <= leg.path_m + 1e-6);
        assert!((leg.elevation_gain_m - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_leg_past_track_end_is_skipped() {
        let track = track(600);
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 8, 0).unwrap();
        let estimator = GeoSplitEstimator::new(&track, start).unwrap();

        let estimates = estimator.estimate(&[Some((0, 100)), None, Some((100, 200))]);
        assert!(estimates[0].is_some());
        assert!(estimates[1].is_none());
        assert!(estimates[2].is_none());
    }

    #[test]
    fn test_start_outside_track() {
        let track = track(600);
        let before = Utc.with_ymd_and_hms(2024, 5, 1, 9, 59, 0).unwrap();
        assert!(matches!(
            GeoSplitEstimator::new(&track, before),
            Err(GeoError::StartOutsideTrack { offset: -60, .. })
        ));
        let after = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        assert!(GeoSplitEstimator::new(&track, after).is_err());
    }
}
