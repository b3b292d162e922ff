use std::io::{self, Read};
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;

use crate::cli::{show_seconds, OutputFormat};
use crate::core::event::EventData;
use crate::parsing::format_detection::DocumentFormat;
use crate::parsing::{parse_document_bytes, ParseConfig, ParseOutcome};

#[derive(Args)]
pub struct ParseArgs {
    /// Results export (HTML). Use '-' for stdin
    #[arg(required = true)]
    pub input: PathBuf,

    /// Event date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Source tag recorded on the event (defaults to the input path)
    #[arg(long)]
    pub source: Option<String>,

    /// Export layout (detected from the document title by default)
    #[arg(long)]
    pub input_format: Option<InputFormat>,

    /// Write the event bundle to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum number of runners accepted from the document
    #[arg(long, default_value_t = crate::utils::validation::MAX_RUNNERS)]
    pub max_runners: usize,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum InputFormat {
    Table,
    TextBlock,
    EmbeddedJson,
}

impl From<InputFormat> for DocumentFormat {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Table => DocumentFormat::Table,
            InputFormat::TextBlock => DocumentFormat::TextBlock,
            InputFormat::EmbeddedJson => DocumentFormat::EmbeddedJson,
        }
    }
}

/// Execute parse subcommand
///
/// # Errors
///
/// Returns an error if the input cannot be read or parsed, or the bundle
/// cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ParseArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let bytes = read_input(&args)?;
    let source = args
        .source
        .clone()
        .unwrap_or_else(|| args.input.display().to_string());

    let config = ParseConfig {
        format: args.input_format.map(DocumentFormat::from),
        date: args.date,
        source: Some(source.clone()),
        max_runners: args.max_runners,
    };
    let outcome = parse_document_bytes(&bytes, &config)
        .map_err(|e| anyhow::anyhow!("Failed to parse {source}: {e}"))?;

    if verbose {
        eprintln!(
            "Parsed {} runners in {} groups ({} skipped records)",
            outcome.event.runners.len(),
            outcome.event.groups.len(),
            outcome.diagnostics.len()
        );
    }

    if let Some(path) = &args.output {
        outcome.event.save(path)?;
        if verbose {
            eprintln!("Wrote event bundle to {}", path.display());
        }
    }

    match format {
        OutputFormat::Text => print_text(&outcome),
        OutputFormat::Json => {
            if args.output.is_none() {
                println!("{}", outcome.event.to_json()?);
            } else {
                print_json_summary(&outcome)?;
            }
        }
        OutputFormat::Tsv => print_tsv(&outcome.event),
    }

    Ok(())
}

fn read_input(args: &ParseArgs) -> anyhow::Result<Vec<u8>> {
    if args.input.to_string_lossy() == "-" {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        return Ok(buffer);
    }
    std::fs::read(&args.input)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", args.input.display()))
}

fn print_text(outcome: &ParseOutcome) {
    let event = &outcome.event;
    println!("{}", event.event.title);
    println!("   Source: {}", event.event.source);
    println!("   Format: {}", event.event.format.display_name());
    if let Some(date) = event.event.date {
        println!("   Date: {date}");
    }
    println!(
        "   Runners: {}, groups: {}, courses: {}, legs: {}",
        event.runners.len(),
        event.groups.len(),
        event.courses.len(),
        event.legs.len()
    );

    println!("\n   Groups:");
    for group in &event.groups {
        println!(
            "   - {} ({} runners, {} courses)",
            group.id,
            group.runners.len(),
            group.courses.len()
        );
    }

    if !outcome.diagnostics.is_empty() {
        println!("\n   Skipped:");
        for diagnostic in &outcome.diagnostics {
            println!("   - {diagnostic}");
        }
    }
}

fn print_json_summary(outcome: &ParseOutcome) -> anyhow::Result<()> {
    let event = &outcome.event;
    let output = serde_json::json!({
        "event": event.event,
        "groups": event.groups.len(),
        "courses": event.courses.len(),
        "legs": event.legs.len(),
        "runners": event.runners.len(),
        "diagnostics": outcome.diagnostics,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// One line per runner: id, group, course, result, then the splits
fn print_tsv(event: &EventData) {
    println!("runner\tgroup\tcourse\tresult\tsplits");
    for runner in &event.runners {
        let splits = event
            .splits
            .row(&runner.id)
            .map(|row| {
                row.values()
                    .into_iter()
                    .map(show_seconds)
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default();
        println!(
            "{}\t{}\t{}\t{}\t{}",
            runner.id,
            runner.group,
            runner.course,
            show_seconds(runner.finished().then_some(runner.result)),
            splits
        );
    }
}
