//! Command-line interface for orient-splits.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **parse**: Parse a results export into a canonical event bundle
//! - **leaderboard**: Rank runners of a group, a leg, or a course
//! - **runner**: Per-leg report for one runner, optionally with GPS estimates
//! - **group**: Leg leaders, wins, margins and backlogs of a group
//! - **track**: Summarize a GPX track
//!
//! ## Usage
//!
//! ```text
//! # Parse an export and keep the bundle
//! orient-splits parse results.html --date 2024-05-01 -o event.json
//!
//! # Fastest runners on a leg, within one group
//! orient-splits leaderboard event.json --scope leg --id 31-45 --group M21
//!
//! # Runner report with leg distances from a watch track
//! orient-splits runner event.json "DOE JOHN^M21" --gpx run.gpx \
//!     --course-start 2024-05-01T10:02:00Z
//!
//! # JSON output for scripting
//! orient-splits group event.json M21 --format json
//! ```

use clap::{Parser, Subcommand};

pub mod group;
pub mod leaderboard;
pub mod parse;
pub mod runner;
pub mod track;

#[derive(Parser)]
#[command(name = "orient-splits")]
#[command(version)]
#[command(about = "Normalize orienteering split-time exports and analyze them")]
#[command(
    long_about = "orient-splits reads split-time exports of the common punching systems (HTML tables, WinOrient text blocks, SportOrg pages) and turns them into one runner x leg matrix.\n\nFrom that matrix it provides:\n- Group, leg and course leaderboards\n- Per-runner reports with cumulative times, leg ranks and backlogs\n- Per-leg distance and climb estimates from a GPX track"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a results export into an event bundle
    Parse(parse::ParseArgs),

    /// Rank runners of a group, leg or course
    Leaderboard(leaderboard::LeaderboardArgs),

    /// Show the per-leg report of one runner
    Runner(runner::RunnerArgs),

    /// Show leg analytics of a group
    Group(group::GroupArgs),

    /// Summarize a GPX track
    Track(track::TrackArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Render an optional duration for text and TSV output
pub(crate) fn show_seconds(value: Option<u32>) -> String {
    value.map_or_else(|| "-".to_string(), crate::core::types::format_seconds)
}
