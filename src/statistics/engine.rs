use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::event::{EventData, Group, Runner};
use crate::core::types::{CourseId, GroupId, LegId, RunnerId, Seconds};
use crate::parsing::gpx::InterpolatedTrack;
use crate::statistics::geosplit::{GeoLegStatistics, GeoSplitEstimator};
use crate::statistics::runner::{
    cumulative_times, leg_windows, RankFilter, RunnerLegStatistics, RunnerStatistics,
};
use crate::statistics::StatsError;

/// One ranked row: a runner and the duration they are ranked by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub runner: RunnerId,
    pub value: Seconds,
}

/// What a leaderboard ranks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardScope {
    /// Finish results of a group
    Group,
    /// Split times on one leg
    Leg,
    /// Finish results of the runners of one course
    Course,
}

/// Fastest runner on a leg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegLeader {
    pub leg: LegId,
    pub runner: RunnerId,
    pub split: Seconds,
}

/// Lead of the fastest runner over second place on a leg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegMargin {
    pub leg: LegId,
    pub leader: RunnerId,
    /// `None` when nobody else ran the leg
    pub margin: Option<Seconds>,
}

/// Deficit of the slowest runner on a leg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegBacklog {
    pub leg: LegId,
    pub runner: RunnerId,
    pub backlog: Seconds,
}

/// Stable sort by value; equal values keep their input order
fn ranked(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by_key(|e| e.value);
    entries
}

/// Competition rank of `value` among `board` (1 + number of strictly faster entries)
fn rank_of(board: &[LeaderboardEntry], value: Seconds) -> usize {
    1 + board.iter().filter(|e| e.value < value).count()
}

/// Backlog of `value` on a leg: behind the leader, or for the leader the
/// non-positive lead over second place (0 when alone).
fn backlog_of(board: &[LeaderboardEntry], value: Seconds) -> Option<i64> {
    let leader = board.first()?.value;
    if value > leader {
        return Some(i64::from(value) - i64::from(leader));
    }
    let second = board.get(1).map_or(leader, |e| e.value);
    Some(i64::from(leader) - i64::from(second))
}

/// Query interface over an immutable event snapshot
#[derive(Debug, Clone, Copy)]
pub struct StatisticsEngine<'a> {
    data: &'a EventData,
}

impl<'a> StatisticsEngine<'a> {
    #[must_use]
    pub fn new(data: &'a EventData) -> Self {
        Self { data }
    }

    #[must_use]
    pub fn data(&self) -> &'a EventData {
        self.data
    }

    fn group(&self, id: &GroupId) -> Result<&'a Group, StatsError> {
        self.data
            .group(id)
            .ok_or_else(|| StatsError::not_found("group", id))
    }

    fn runner(&self, id: &RunnerId) -> Result<&'a Runner, StatsError> {
        self.data
            .runner(id)
            .ok_or_else(|| StatsError::not_found("runner", id))
    }

    fn split(&self, runner: &RunnerId, leg: &LegId, occurrence: usize) -> Option<Seconds> {
        self.data
            .splits
            .get_nth(runner, leg, occurrence)
            .and_then(|cell| cell.seconds())
    }

    /// Every runner of a group by finish result, DNF last
    ///
    /// # Errors
    ///
    /// Returns `StatsError::NotFound` for an unknown group.
    pub fn group_leaderboard(&self, group: &GroupId) -> Result<Vec<LeaderboardEntry>, StatsError> {
        let group = self.group(group)?;
        let entries = group
            .runners
            .iter()
            .map(|id| {
                self.runner(id).map(|runner| LeaderboardEntry {
                    runner: runner.id.clone(),
                    value: runner.result,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ranked(entries))
    }

    /// Runners with a time on `leg`, fastest first, optionally limited to one
    /// group. A leg run twice on one course is ranked by its first run.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::NotFound` for an unknown leg or group.
    pub fn leg_leaderboard(
        &self,
        leg: &LegId,
        group: Option<&GroupId>,
    ) -> Result<Vec<LeaderboardEntry>, StatsError> {
        self.leg_run_leaderboard(leg, 0, group)
    }

    /// Leaderboard of the `occurrence`-th (0-based) run of `leg`; runners
    /// whose course repeats the leg fewer times are left out
    ///
    /// # Errors
    ///
    /// Returns `StatsError::NotFound` for an unknown leg or group.
    pub fn leg_run_leaderboard(
        &self,
        leg: &LegId,
        occurrence: usize,
        group: Option<&GroupId>,
    ) -> Result<Vec<LeaderboardEntry>, StatsError> {
        self.data
            .leg(leg)
            .ok_or_else(|| StatsError::not_found("leg", leg))?;
        if let Some(group) = group {
            self.group(group)?;
        }

        let entries = self
            .data
            .runners
            .iter()
            .filter(|r| group.map_or(true, |g| &r.group == g))
            .filter_map(|r| {
                self.split(&r.id, leg, occurrence).map(|value| LeaderboardEntry {
                    runner: r.id.clone(),
                    value,
                })
            })
            .collect();
        Ok(ranked(entries))
    }

    /// Runners of one course by finish result, optionally limited to one group
    ///
    /// # Errors
    ///
    /// Returns `StatsError::NotFound` for an unknown course or group.
    pub fn course_leaderboard(
        &self,
        course: &CourseId,
        group: Option<&GroupId>,
    ) -> Result<Vec<LeaderboardEntry>, StatsError> {
        self.data
            .course(course)
            .ok_or_else(|| StatsError::not_found("course", course))?;
        if let Some(group) = group {
            self.group(group)?;
        }

        let entries = self
            .data
            .runners
            .iter()
            .filter(|r| &r.course == course && group.map_or(true, |g| &r.group == g))
            .map(|r| LeaderboardEntry {
                runner: r.id.clone(),
                value: r.result,
            })
            .collect();
        Ok(ranked(entries))
    }

    /// Dispatch to the leaderboard of `scope`. The group filter does not apply
    /// to group leaderboards.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::NotFound` for an unknown identifier.
    pub fn leaderboard(
        &self,
        scope: LeaderboardScope,
        id: &str,
        group: Option<&GroupId>,
    ) -> Result<Vec<LeaderboardEntry>, StatsError> {
        debug!(?scope, id, "Computing leaderboard");
        match scope {
            LeaderboardScope::Group => self.group_leaderboard(&GroupId::new(id)),
            LeaderboardScope::Leg => self.leg_leaderboard(&LegId::new(id), group),
            LeaderboardScope::Course => self.course_leaderboard(&CourseId::new(id), group),
        }
    }

    /// Legs run by a group, in order of first appearance over its courses
    fn group_legs(&self, group: &Group) -> Vec<&'a LegId> {
        let mut legs: Vec<&'a LegId> = Vec::new();
        for course in group.courses.iter().filter_map(|c| self.data.course(c)) {
            for leg in &course.legs {
                if !legs.contains(&leg) {
                    legs.push(leg);
                }
            }
        }
        legs
    }

    fn group_leg_boards(
        &self,
        group: &GroupId,
    ) -> Result<Vec<(LegId, Vec<LeaderboardEntry>)>, StatsError> {
        let record = self.group(group)?;
        self.group_legs(record)
            .into_iter()
            .map(|leg| {
                self.leg_leaderboard(leg, Some(group))
                    .map(|board| (leg.clone(), board))
            })
            .filter(|item| !matches!(item, Ok((_, board)) if board.is_empty()))
            .collect()
    }

    /// Fastest runner on each leg the group ran
    ///
    /// # Errors
    ///
    /// Returns `StatsError::NotFound` for an unknown group.
    pub fn leg_leaders(&self, group: &GroupId) -> Result<Vec<LegLeader>, StatsError> {
        Ok(self
            .group_leg_boards(group)?
            .into_iter()
            .filter_map(|(leg, board)| {
                board.into_iter().next().map(|first| LegLeader {
                    leg,
                    runner: first.runner,
                    split: first.value,
                })
            })
            .collect())
    }

    /// Number of legs won by each runner of the group, most wins first
    ///
    /// # Errors
    ///
    /// Returns `StatsError::NotFound` for an unknown group.
    pub fn wins_by_runner(&self, group: &GroupId) -> Result<Vec<(RunnerId, usize)>, StatsError> {
        let leaders = self.leg_leaders(group)?;
        let mut wins: Vec<(RunnerId, usize)> = self
            .group(group)?
            .runners
            .iter()
            .map(|runner| {
                let count = leaders.iter().filter(|l| &l.runner == runner).count();
                (runner.clone(), count)
            })
            .filter(|(_, count)| *count > 0)
            .collect();
        wins.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(wins)
    }

    /// Leader's lead over second place on each leg, largest first
    ///
    /// # Errors
    ///
    /// Returns `StatsError::NotFound` for an unknown group.
    pub fn winning_margins(&self, group: &GroupId) -> Result<Vec<LegMargin>, StatsError> {
        let mut margins: Vec<LegMargin> = self
            .group_leg_boards(group)?
            .into_iter()
            .filter_map(|(leg, board)| {
                let leader = board.first()?;
                Some(LegMargin {
                    leg,
                    leader: leader.runner.clone(),
                    margin: board.get(1).map(|second| second.value - leader.value),
                })
            })
            .collect();
        margins.sort_by(|a, b| b.margin.cmp(&a.margin));
        Ok(margins)
    }

    /// Slowest runner's deficit to the leader on each leg, largest first
    ///
    /// # Errors
    ///
    /// Returns `StatsError::NotFound` for an unknown group.
    pub fn biggest_backlogs(&self, group: &GroupId) -> Result<Vec<LegBacklog>, StatsError> {
        let mut backlogs: Vec<LegBacklog> = self
            .group_leg_boards(group)?
            .into_iter()
            .filter_map(|(leg, board)| {
                let (first, last) = (board.first()?, board.last()?);
                Some(LegBacklog {
                    leg,
                    runner: last.runner.clone(),
                    backlog: last.value - first.value,
                })
            })
            .collect();
        backlogs.sort_by(|a, b| b.backlog.cmp(&a.backlog));
        Ok(backlogs)
    }

    /// Per-leg report of one runner: split, cumulative time, leg rank and backlog
    ///
    /// # Errors
    ///
    /// Returns `StatsError::NotFound` for an unknown runner, or if the
    /// runner's group or course is missing from the event.
    pub fn runner_statistics(
        &self,
        runner: &RunnerId,
        filter: RankFilter,
    ) -> Result<RunnerStatistics, StatsError> {
        let record = self.runner(runner)?;
        let row = self
            .data
            .splits
            .row(runner)
            .ok_or_else(|| StatsError::not_found("split row", runner))?;
        let splits = row.values();
        let cumulative = cumulative_times(&splits, record.result);

        let place = self
            .group_leaderboard(&record.group)?
            .iter()
            .position(|e| &e.runner == runner)
            .map(|i| i + 1)
            .ok_or_else(|| StatsError::not_found("group member", runner))?;

        let group_filter = match filter {
            RankFilter::Group => Some(&record.group),
            RankFilter::All => None,
        };

        let mut legs = Vec::with_capacity(splits.len());
        let mut runs: HashMap<&LegId, usize> = HashMap::new();
        for ((leg, split), cumulative) in row.legs().zip(&splits).zip(cumulative) {
            let occurrence = runs.entry(leg).or_default();
            let run = *occurrence;
            *occurrence += 1;
            let (place, backlog) = match split {
                Some(value) => {
                    let board = self.leg_run_leaderboard(leg, run, group_filter)?;
                    (Some(rank_of(&board, *value)), backlog_of(&board, *value))
                }
                None => (None, None),
            };
            legs.push(RunnerLegStatistics {
                leg: leg.clone(),
                split: *split,
                cumulative,
                place,
                backlog,
                geo: None,
            });
        }

        Ok(RunnerStatistics {
            runner: record.id.clone(),
            group: record.group.clone(),
            course: record.course.clone(),
            place,
            result: record.result,
            finished: record.finished(),
            legs,
        })
    }

    /// Per-leg GPS estimates for a runner whose course started at `course_start`
    /// on `track`, aligned with the runner's legs. Legs that cannot be placed
    /// in time or that end after the track are `None`.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::NotFound` for an unknown runner and
    /// `StatsError::Geo` if the course start is not on the track.
    pub fn geo_statistics(
        &self,
        runner: &RunnerId,
        track: &InterpolatedTrack,
        course_start: DateTime<Utc>,
    ) -> Result<Vec<Option<GeoLegStatistics>>, StatsError> {
        let record = self.runner(runner)?;
        let row = self
            .data
            .splits
            .row(runner)
            .ok_or_else(|| StatsError::not_found("split row", runner))?;

        let estimator = GeoSplitEstimator::new(track, course_start)?;
        let windows = leg_windows(&row.values(), record.result);
        Ok(estimator.estimate(&windows))
    }
}
