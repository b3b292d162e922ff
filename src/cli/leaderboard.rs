use std::path::PathBuf;

use clap::Args;

use crate::cli::OutputFormat;
use crate::core::event::EventData;
use crate::core::types::{format_seconds, GroupId, DNF_SECONDS};
use crate::statistics::{LeaderboardEntry, LeaderboardScope, StatisticsEngine};

#[derive(Args)]
pub struct LeaderboardArgs {
    /// Event bundle written by `parse`
    #[arg(required = true)]
    pub bundle: PathBuf,

    /// What to rank
    #[arg(long, value_enum, default_value = "group")]
    pub scope: Scope,

    /// Group, leg (e.g. 31-45) or course (e.g. M21#1) identifier
    #[arg(long, required = true)]
    pub id: String,

    /// Only rank runners of this group (leg and course scopes)
    #[arg(long)]
    pub group: Option<String>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum Scope {
    Group,
    Leg,
    Course,
}

impl From<Scope> for LeaderboardScope {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::Group => LeaderboardScope::Group,
            Scope::Leg => LeaderboardScope::Leg,
            Scope::Course => LeaderboardScope::Course,
        }
    }
}

/// Execute leaderboard subcommand
///
/// # Errors
///
/// Returns an error if the bundle cannot be loaded or the identifier is unknown.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: LeaderboardArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let data = EventData::load(&args.bundle)
        .map_err(|e| anyhow::anyhow!("Failed to load {}: {e}", args.bundle.display()))?;
    let engine = StatisticsEngine::new(&data);

    let group = args.group.as_deref().map(GroupId::new);
    let board = engine.leaderboard(args.scope.into(), &args.id, group.as_ref())?;

    if verbose {
        eprintln!("{} ranked runners", board.len());
    }

    match format {
        OutputFormat::Text => print_text(&data, &board),
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = board
                .iter()
                .enumerate()
                .map(|(i, entry)| {
                    serde_json::json!({
                        "rank": i + 1,
                        "runner": entry.runner,
                        "seconds": entry.value,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("rank\trunner\tseconds");
            for (i, entry) in board.iter().enumerate() {
                println!("{}\t{}\t{}", i + 1, entry.runner, entry.value);
            }
        }
    }

    Ok(())
}

fn print_text(data: &EventData, board: &[LeaderboardEntry]) {
    if board.is_empty() {
        println!("No runners with a time.");
        return;
    }
    let best = board[0].value;
    for (i, entry) in board.iter().enumerate() {
        let name = data
            .runner(&entry.runner)
            .map_or_else(|| entry.runner.to_string(), |r| format!("{} {}", r.surname, r.name));
        if entry.value >= DNF_SECONDS {
            println!("{:>4}. {:<32} DNF", i + 1, name);
        } else {
            println!(
                "{:>4}. {:<32} {:>9}  +{}",
                i + 1,
                name,
                format_seconds(entry.value),
                format_seconds(entry.value - best)
            );
        }
    }
}
