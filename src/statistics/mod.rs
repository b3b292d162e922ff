//! Analytical queries over a parsed event.
//!
//! Everything here borrows an [`EventData`](crate::core::event::EventData)
//! snapshot and derives new values; nothing mutates the event.
//!
//! - [`engine`]: leaderboards (group, leg, course), group analytics and the
//!   per-runner report
//! - [`runner`]: cumulative-time reconstruction over sparse splits
//! - [`geosplit`]: per-leg distance and climb from a GPS track
//!
//! ## Example
//!
//! ```rust,no_run
//! use orient_splits::core::event::EventData;
//! use orient_splits::core::types::GroupId;
//! use orient_splits::statistics::StatisticsEngine;
//!
//! let data = EventData::load(std::path::Path::new("event.json")).unwrap();
//! let engine = StatisticsEngine::new(&data);
//! for (place, entry) in engine.group_leaderboard(&GroupId::new("M21")).unwrap().iter().enumerate() {
//!     println!("{}. {} {}", place + 1, entry.runner, entry.value);
//! }
//! ```

pub mod engine;
pub mod geosplit;
pub mod runner;

use thiserror::Error;

pub use engine::{
    LeaderboardEntry, LeaderboardScope, LegBacklog, LegLeader, LegMargin, StatisticsEngine,
};
pub use geosplit::{GeoError, GeoLegStatistics, GeoSplitEstimator};
pub use runner::{cumulative_times, leg_windows, RankFilter, RunnerLegStatistics, RunnerStatistics};

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("GPS estimation failed: {0}")]
    Geo(#[from] GeoError),
}

impl StatsError {
    pub(crate) fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
