//! Parsers for the supported results exports.
//!
//! Three legacy punching systems are supported, each with its own layout:
//!
//! - **Table exports** ([`table`]): one HTML table per group, preceded by an
//!   `<h2>` group heading. The default when nothing else is recognized.
//! - **Text-block exports** ([`text_block`]): WinOrient `<pre>` blocks, one per
//!   group heading, in four line sub-layouts.
//! - **Embedded-JSON exports** ([`embedded_json`]): SportOrg pages carrying the
//!   whole race as a `var race = {...}` script literal.
//!
//! [`format_detection`] picks the parser. Every parser returns a [`RawEvent`]:
//! per-group runners with their ordered legs and splits, plus a list of
//! [`Diagnostic`]s for records that were skipped. A broken record never aborts
//! the document; only document-level failures are errors.
//!
//! GPS tracks are read separately by [`gpx`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use orient_splits::parsing::{parse_document, ParseConfig};
//!
//! let html = std::fs::read_to_string("results.html").unwrap();
//! let outcome = parse_document(&html, &ParseConfig::default()).unwrap();
//! println!("{} runners", outcome.event.runners.len());
//! for diagnostic in &outcome.diagnostics {
//!     eprintln!("skipped {diagnostic}");
//! }
//! ```

pub mod embedded_json;
pub mod format_detection;
pub mod gpx;
mod html;
pub mod table;
pub mod text_block;
pub mod timing;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::event::EventData;
use crate::core::types::{Diagnostic, Leg, RunnerId, Seconds};
use crate::course::assembly::{assemble_event, EventMeta};
use crate::parsing::format_detection::{detect_format, document_title, DocumentFormat};
use crate::utils::validation::MAX_RUNNERS;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document is empty")]
    EmptyDocument,

    #[error("Unrecognized layout: {0}")]
    UnrecognizedLayout(String),

    #[error("Runner {runner} has {legs} legs but {splits} splits")]
    LengthMismatch {
        runner: RunnerId,
        legs: usize,
        splits: usize,
    },

    #[error("Invalid document format: {0}")]
    InvalidFormat(String),

    #[error("Invalid embedded race data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Too many runners: {0} exceeds the configured maximum")]
    TooManyRunners(usize),
}

/// One runner as extracted from a document, before course deduplication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRunner {
    /// Normalized display name, without the group suffix
    pub name: String,
    pub result: Seconds,
    pub legs: Vec<Leg>,
    /// One entry per leg; `None` where no valid time could be derived
    pub splits: Vec<Option<Seconds>>,
    /// Control codes are ordinals made up by the parser, not printed codes
    pub ordinal_codes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawGroup {
    pub name: String,
    pub runners: Vec<RawRunner>,
}

/// Parser output: raw per-group splits plus skipped-record diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEvent {
    pub groups: Vec<RawGroup>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RawEvent {
    pub fn skip(&mut self, record: impl Into<String>, reason: impl std::fmt::Display) {
        let diagnostic = Diagnostic::new(record, reason.to_string());
        tracing::warn!(record = %diagnostic.record, reason = %diagnostic.reason, "Skipping record");
        self.diagnostics.push(diagnostic);
    }

    #[must_use]
    pub fn runner_count(&self) -> usize {
        self.groups.iter().map(|g| g.runners.len()).sum()
    }
}

/// Options for a document parse
#[derive(Debug, Clone)]
pub struct ParseConfig {
    /// Skip classification and use this parser
    pub format: Option<DocumentFormat>,
    /// Date of the event (documents rarely carry a machine-readable one)
    pub date: Option<NaiveDate>,
    /// URL or filename of the document, used for diagnostics
    pub source: Option<String>,
    /// Upper bound on runners accepted from one document
    pub max_runners: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            format: None,
            date: None,
            source: None,
            max_runners: MAX_RUNNERS,
        }
    }
}

/// A parsed event plus every record that had to be skipped
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub event: EventData,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a results document into the canonical event model
///
/// # Errors
///
/// Returns `ParseError::EmptyDocument` for blank input, a document-level
/// error from the selected parser, or `ParseError::InvalidFormat` when no
/// runner survives parsing.
pub fn parse_document(content: &str, config: &ParseConfig) -> Result<ParseOutcome, ParseError> {
    let format = match config.format {
        Some(format) => format,
        None => detect_format(content)?,
    };
    let source = config.source.clone().unwrap_or_else(|| "<input>".to_string());
    info!(source = %source, format = format.display_name(), "Parsing results document");

    let raw = parse_with_format(content, format)?;
    debug!(
        groups = raw.groups.len(),
        runners = raw.runner_count(),
        skipped = raw.diagnostics.len(),
        "Raw parse finished"
    );

    let meta = EventMeta {
        title: document_title(content).unwrap_or_else(|| source.clone()),
        source,
        date: config.date,
        format,
        content,
        max_runners: config.max_runners,
    };
    let event = assemble_event(raw, &meta)?;
    let diagnostics = event.diagnostics.clone();
    Ok(ParseOutcome { event, diagnostics })
}

/// Parse raw document bytes, replacing invalid UTF-8 sequences
///
/// # Errors
///
/// See [`parse_document`].
pub fn parse_document_bytes(bytes: &[u8], config: &ParseConfig) -> Result<ParseOutcome, ParseError> {
    let content = String::from_utf8_lossy(bytes);
    parse_document(&content, config)
}

/// Run the parser for `format` over the document text
///
/// # Errors
///
/// Returns `ParseError::EmptyDocument` for blank input, or the parser's
/// document-level error.
pub fn parse_with_format(content: &str, format: DocumentFormat) -> Result<RawEvent, ParseError> {
    if content.trim().is_empty() {
        return Err(ParseError::EmptyDocument);
    }
    match format {
        DocumentFormat::Table => table::parse(content),
        DocumentFormat::TextBlock => text_block::parse(content),
        DocumentFormat::EmbeddedJson => embedded_json::parse(content),
    }
}
