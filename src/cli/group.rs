use std::path::PathBuf;

use clap::Args;

use crate::cli::{show_seconds, OutputFormat};
use crate::core::event::EventData;
use crate::core::types::{format_seconds, GroupId};
use crate::statistics::StatisticsEngine;

#[derive(Args)]
pub struct GroupArgs {
    /// Event bundle written by `parse`
    #[arg(required = true)]
    pub bundle: PathBuf,

    /// Group identifier, e.g. M21
    #[arg(required = true)]
    pub group: String,
}

/// Execute group subcommand
///
/// # Errors
///
/// Returns an error if the bundle cannot be loaded or the group is unknown.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: GroupArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let data = EventData::load(&args.bundle)
        .map_err(|e| anyhow::anyhow!("Failed to load {}: {e}", args.bundle.display()))?;
    let engine = StatisticsEngine::new(&data);
    let group = GroupId::new(args.group.to_uppercase());

    let leaders = engine.leg_leaders(&group)?;
    let wins = engine.wins_by_runner(&group)?;
    let margins = engine.winning_margins(&group)?;
    let backlogs = engine.biggest_backlogs(&group)?;

    if verbose {
        eprintln!("{} legs run by group {group}", leaders.len());
    }

    match format {
        OutputFormat::Text => {
            println!("Group {group}");
            println!("\n   Leg leaders:");
            for leader in &leaders {
                println!(
                    "   - {:<10} {} {}",
                    leader.leg.as_str(),
                    leader.runner,
                    format_seconds(leader.split)
                );
            }
            println!("\n   Legs won:");
            for (runner, count) in &wins {
                println!("   - {runner}: {count}");
            }
            println!("\n   Winning margins:");
            for margin in &margins {
                println!(
                    "   - {:<10} {} by {}",
                    margin.leg.as_str(),
                    margin.leader,
                    show_seconds(margin.margin)
                );
            }
            println!("\n   Biggest backlogs:");
            for backlog in &backlogs {
                println!(
                    "   - {:<10} {} {}",
                    backlog.leg.as_str(),
                    backlog.runner,
                    format_seconds(backlog.backlog)
                );
            }
        }
        OutputFormat::Json => {
            let wins: Vec<serde_json::Value> = wins
                .iter()
                .map(|(runner, count)| serde_json::json!({ "runner": runner, "legs": count }))
                .collect();
            let output = serde_json::json!({
                "group": group,
                "leaders": leaders,
                "wins": wins,
                "margins": margins,
                "backlogs": backlogs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("leg\tleader\tsplit\tmargin\tslowest\tbacklog");
            for leader in &leaders {
                let margin = margins.iter().find(|m| m.leg == leader.leg);
                let backlog = backlogs.iter().find(|b| b.leg == leader.leg);
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    leader.leg,
                    leader.runner,
                    leader.split,
                    margin
                        .and_then(|m| m.margin)
                        .map(|m| m.to_string())
                        .unwrap_or_default(),
                    backlog.map(|b| b.runner.to_string()).unwrap_or_default(),
                    backlog.map(|b| b.backlog.to_string()).unwrap_or_default(),
                );
            }
        }
    }

    Ok(())
}
