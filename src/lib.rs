//! # orient-splits
//!
//! A library for normalizing orienteering split-time exports.
//!
//! Results of an orienteering event are published by whatever punching system
//! the organizers used, and every system lays out split times differently.
//! `orient-splits` reads those exports into one canonical model: a runner x leg
//! matrix of split durations, with the groups, courses and legs it refers to.
//!
//! ## Features
//!
//! - **Three export layouts**: HTML tables, WinOrient text blocks and SportOrg
//!   embedded race data, chosen from the document title
//! - **Partial results**: broken records are skipped and reported as
//!   diagnostics instead of failing the whole document
//! - **Course detection**: runners with identical control sequences share a course
//! - **Leaderboards**: by group, leg or course
//! - **Runner reports**: cumulative times over missing punches, leg ranks and backlogs
//! - **GPS legs**: per-leg distance and climb from a GPX track
//!
//! ## Example
//!
//! ```rust,no_run
//! use orient_splits::{parse_document, ParseConfig, RankFilter, RunnerId, StatisticsEngine};
//!
//! let html = std::fs::read_to_string("results.html").unwrap();
//! let outcome = parse_document(&html, &ParseConfig::default()).unwrap();
//!
//! let engine = StatisticsEngine::new(&outcome.event);
//! let report = engine
//!     .runner_statistics(&RunnerId::new("DOE JOHN^M21"), RankFilter::Group)
//!     .unwrap();
//! for leg in &report.legs {
//!     println!("{} {:?} {:?}", leg.leg, leg.split, leg.place);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Event model, identifiers and the split matrix
//! - [`parsing`]: Export parsers and GPX intake
//! - [`course`]: Course detection and event assembly
//! - [`statistics`]: Leaderboards, runner reports and GPS estimates
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod core;
pub mod course;
pub mod parsing;
pub mod statistics;
pub mod utils;

// Re-export commonly used types for convenience
pub use crate::core::event::{EventData, SplitMatrix};
pub use crate::core::types::*;
pub use parsing::{parse_document, ParseConfig, ParseError, ParseOutcome};
pub use statistics::{RankFilter, StatisticsEngine};
