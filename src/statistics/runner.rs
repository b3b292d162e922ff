//! Per-runner report types and time reconstruction over sparse splits.
//!
//! A runner's splits may have holes (missed controls, clock errors). Elapsed
//! times are rebuilt forward from the start up to the first hole and backward
//! from the finish result after the last hole; anything in between is unknown.

use serde::{Deserialize, Serialize};

use crate::core::types::{CourseId, GroupId, LegId, RunnerId, Seconds, DNF_SECONDS};
use crate::statistics::geosplit::GeoLegStatistics;

/// Which runners a runner is ranked against on each leg
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankFilter {
    /// Runners of the same group
    #[default]
    Group,
    /// Every runner of the event who ran the leg
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerLegStatistics {
    pub leg: LegId,
    pub split: Option<Seconds>,
    /// Elapsed time attributed to this leg by the forward/backward reconstruction
    pub cumulative: Option<Seconds>,
    /// Competition rank on the leg (ties share the better rank)
    pub place: Option<usize>,
    /// Seconds behind the leg leader; for the leader, the (non-positive) lead over second place
    pub backlog: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoLegStatistics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerStatistics {
    pub runner: RunnerId,
    pub group: GroupId,
    pub course: CourseId,
    /// 1-based position in the group leaderboard
    pub place: usize,
    pub result: Seconds,
    pub finished: bool,
    pub legs: Vec<RunnerLegStatistics>,
}

impl RunnerStatistics {
    /// Attach per-leg GPS estimates, aligned with `legs`
    pub fn attach_geo(&mut self, geo: Vec<Option<GeoLegStatistics>>) {
        for (leg, estimate) in self.legs.iter_mut().zip(geo) {
            leg.geo = estimate;
        }
    }
}

/// Indices of the first and last missing split
fn missing_span(splits: &[Option<Seconds>]) -> Option<(usize, usize)> {
    let first = splits.iter().position(Option::is_none)?;
    let last = splits.iter().rposition(Option::is_none)?;
    Some((first, last))
}

fn known_sum(splits: &[Option<Seconds>]) -> u64 {
    splits.iter().flatten().map(|&s| u64::from(s)).sum()
}

fn from_finish(result: Seconds, tail: &[Option<Seconds>]) -> Option<Seconds> {
    if result >= DNF_SECONDS {
        return None;
    }
    u64::from(result)
        .checked_sub(known_sum(tail))
        .and_then(|v| Seconds::try_from(v).ok())
}

/// Cumulative ("general") time for every leg of a course.
///
/// Before the first missing leg the value is the running sum of splits up to
/// and including the leg. Between the first and last missing leg it is
/// unknown. After the last missing leg it is the finish result minus the
/// splits from this leg to the end. Runners without a finish result get no
/// backward values.
#[must_use]
pub fn cumulative_times(splits: &[Option<Seconds>], result: Seconds) -> Vec<Option<Seconds>> {
    let span = missing_span(splits);
    (0..splits.len())
        .map(|n| match span {
            Some((first, _)) if n < first => Seconds::try_from(known_sum(&splits[..=n])).ok(),
            None => Seconds::try_from(known_sum(&splits[..=n])).ok(),
            Some((_, last)) if n > last => from_finish(result, &splits[n..]),
            Some(_) => None,
        })
        .collect()
}

/// Elapsed `(start, end)` offsets of every leg from the course start.
///
/// Legs before the first hole are placed forward from the start; legs after
/// the last hole are placed backward from the finish result. Missing legs
/// and legs that cannot be placed are `None`.
#[must_use]
pub fn leg_windows(splits: &[Option<Seconds>], result: Seconds) -> Vec<Option<(Seconds, Seconds)>> {
    let span = missing_span(splits);
    splits
        .iter()
        .enumerate()
        .map(|(n, split)| {
            let split = (*split)?;
            let forward = match span {
                None => true,
                Some((first, _)) => n < first,
            };
            if forward {
                let start = Seconds::try_from(known_sum(&splits[..n])).ok()?;
                Some((start, start.checked_add(split)?))
            } else {
                let end = from_finish(result, &splits[n + 1..])?;
                Some((end.checked_sub(split)?, end))
            }
        })
        .collect()
}
