//! GPS track intake.
//!
//! A GPX file is reduced to one position per second of the recording, so that
//! any elapsed offset from a course start maps directly to a point index.

use std::io::Cursor;

use chrono::{DateTime, Utc};
use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::utils::geodesy::{haversine_distance, positive_elevation_gain};

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("GPX parsing error: {0}")]
    Gpx(String),

    #[error("Track has no points")]
    EmptyTrack,

    #[error("Track points carry no timestamps")]
    MissingTime,
}

/// One position of the track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    /// Elevation in meters
    pub ele: f64,
}

/// Totals over the raw fixes of a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub distance_m: f64,
    pub elevation_gain_m: f64,
    pub duration_s: u32,
    pub start_point: TrackPoint,
    /// Longitude/latitude bounding box of the fixes
    pub bounds: Rect<f64>,
}

/// A track resampled at one point per second from `start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpolatedTrack {
    pub start: DateTime<Utc>,
    /// `points[k]` is the position `k` seconds after `start`
    pub points: Vec<TrackPoint>,
    pub summary: TrackSummary,
}

impl InterpolatedTrack {
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct Fix {
    /// Seconds since the first fix
    offset: f64,
    lat: f64,
    lon: f64,
    ele: Option<f64>,
}

/// Read a GPX document into a per-second track
///
/// Track points are used when present, route points otherwise. Fixes without
/// a timestamp are dropped.
///
/// # Errors
///
/// Returns `TrackError::Gpx` if the document cannot be read,
/// `TrackError::EmptyTrack` if it has no points, and `TrackError::MissingTime`
/// if none of its points is timestamped.
pub fn read_track(bytes: &[u8]) -> Result<InterpolatedTrack, TrackError> {
    let gpx = ::gpx::read(Cursor::new(bytes)).map_err(|e| TrackError::Gpx(e.to_string()))?;

    let mut waypoints: Vec<&::gpx::Waypoint> = gpx
        .tracks
        .iter()
        .flat_map(|track| &track.segments)
        .flat_map(|segment| &segment.points)
        .collect();
    if waypoints.is_empty() {
        waypoints = gpx.routes.iter().flat_map(|route| &route.points).collect();
    }
    if waypoints.is_empty() {
        return Err(TrackError::EmptyTrack);
    }

    let mut timed: Vec<(DateTime<Utc>, &::gpx::Waypoint)> = Vec::with_capacity(waypoints.len());
    for waypoint in &waypoints {
        let Some(time) = &waypoint.time else {
            continue;
        };
        let iso = time.format().map_err(|e| TrackError::Gpx(e.to_string()))?;
        let utc = DateTime::parse_from_rfc3339(&iso)
            .map_err(|e| TrackError::Gpx(e.to_string()))?
            .with_timezone(&Utc);
        timed.push((utc, *waypoint));
    }
    if timed.is_empty() {
        return Err(TrackError::MissingTime);
    }
    if timed.len() < waypoints.len() {
        warn!(
            dropped = waypoints.len() - timed.len(),
            "Ignoring track points without a timestamp"
        );
    }
    timed.sort_by_key(|(time, _)| *time);

    let start = timed[0].0;
    let mut fixes: Vec<Fix> = timed
        .iter()
        .map(|(time, waypoint)| {
            let point = waypoint.point();
            Fix {
                offset: (*time - start).num_milliseconds() as f64 / 1000.0,
                lat: point.y(),
                lon: point.x(),
                ele: waypoint.elevation,
            }
        })
        .collect();

    let summary = summarize(&fixes, start, timed[timed.len() - 1].0);
    fill_elevations(&mut fixes);
    let points = resample(&fixes, summary.duration_s);
    debug!(
        fixes = fixes.len(),
        seconds = points.len(),
        distance_m = summary.distance_m,
        "Resampled track"
    );

    Ok(InterpolatedTrack {
        start,
        points,
        summary,
    })
}

fn summarize(fixes: &[Fix], start: DateTime<Utc>, end: DateTime<Utc>) -> TrackSummary {
    let distance_m = fixes
        .windows(2)
        .map(|w| haversine_distance(w[0].lat, w[0].lon, w[1].lat, w[1].lon))
        .sum();
    let elevation_gain_m = positive_elevation_gain(fixes.iter().filter_map(|f| f.ele));

    let (mut min, mut max) = (
        Coord { x: f64::INFINITY, y: f64::INFINITY },
        Coord { x: f64::NEG_INFINITY, y: f64::NEG_INFINITY },
    );
    for fix in fixes {
        min.x = min.x.min(fix.lon);
        min.y = min.y.min(fix.lat);
        max.x = max.x.max(fix.lon);
        max.y = max.y.max(fix.lat);
    }

    let first = fixes[0];
    TrackSummary {
        distance_m,
        elevation_gain_m,
        duration_s: u32::try_from((end - start).num_seconds()).unwrap_or(u32::MAX),
        start_point: TrackPoint {
            lat: first.lat,
            lon: first.lon,
            ele: first.ele.unwrap_or(0.0),
        },
        bounds: Rect::new(min, max),
    }
}

fn lerp(a: f64, b: f64, ratio: f64) -> f64 {
    a + (b - a) * ratio
}

/// Fill missing elevations linearly in time from the nearest known fixes
fn fill_elevations(fixes: &mut [Fix]) {
    let known: Vec<usize> = (0..fixes.len()).filter(|&i| fixes[i].ele.is_some()).collect();
    if known.is_empty() {
        for fix in fixes.iter_mut() {
            fix.ele = Some(0.0);
        }
        return;
    }

    for i in 0..fixes.len() {
        if fixes[i].ele.is_some() {
            continue;
        }
        let before = known.iter().rev().find(|&&k| k < i).copied();
        let after = known.iter().find(|&&k| k > i).copied();
        let ele = match (before, after) {
            (Some(b), Some(a)) => {
                let (fb, fa) = (fixes[b], fixes[a]);
                let span = fa.offset - fb.offset;
                let (eb, ea) = (fb.ele.unwrap_or(0.0), fa.ele.unwrap_or(0.0));
                if span > 0.0 {
                    lerp(eb, ea, (fixes[i].offset - fb.offset) / span)
                } else {
                    eb
                }
            }
            (Some(k), None) | (None, Some(k)) => fixes[k].ele.unwrap_or(0.0),
            (None, None) => 0.0,
        };
        fixes[i].ele = Some(ele);
    }
}

/// Positions at every whole second from 0 to `duration` inclusive
fn resample(fixes: &[Fix], duration: u32) -> Vec<TrackPoint> {
    let mut points = Vec::with_capacity(duration as usize + 1);
    let mut j = 0;
    for k in 0..=duration {
        let t = f64::from(k);
        while j + 1 < fixes.len() && fixes[j + 1].offset <= t {
            j += 1;
        }
        let a = fixes[j];
        let point = match fixes.get(j + 1) {
            Some(b) if b.offset > a.offset => {
                let ratio = ((t - a.offset) / (b.offset - a.offset)).clamp(0.0, 1.0);
                TrackPoint {
                    lat: lerp(a.lat, b.lat, ratio),
                    lon: lerp(a.lon, b.lon, ratio),
                    ele: lerp(a.ele.unwrap_or(0.0), b.ele.unwrap_or(0.0), ratio),
                }
            }
            _ => TrackPoint {
                lat: a.lat,
                lon: a.lon,
                ele: a.ele.unwrap_or(0.0),
            },
        };
        points.push(point);
    }
    points
}
