use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Args;

use crate::cli::{show_seconds, OutputFormat};
use crate::core::event::EventData;
use crate::core::types::{format_seconds, RunnerId};
use crate::parsing::gpx::read_track;
use crate::statistics::{RankFilter, RunnerStatistics, StatisticsEngine};

#[derive(Args)]
pub struct RunnerArgs {
    /// Event bundle written by `parse`
    #[arg(required = true)]
    pub bundle: PathBuf,

    /// Runner identifier, e.g. "DOE JOHN^M21"
    #[arg(required = true)]
    pub runner: String,

    /// Rank legs against the runner's group or the whole event
    #[arg(long, value_enum, default_value = "group")]
    pub filter: Filter,

    /// GPX track recorded by the runner
    #[arg(long, requires = "course_start")]
    pub gpx: Option<PathBuf>,

    /// Time the runner started the course (RFC 3339)
    #[arg(long, requires = "gpx")]
    pub course_start: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum Filter {
    Group,
    All,
}

impl From<Filter> for RankFilter {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Group => RankFilter::Group,
            Filter::All => RankFilter::All,
        }
    }
}

/// Execute runner subcommand
///
/// # Errors
///
/// Returns an error if the bundle or track cannot be loaded, the runner is
/// unknown, or the course start is outside the track.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: RunnerArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let data = EventData::load(&args.bundle)
        .map_err(|e| anyhow::anyhow!("Failed to load {}: {e}", args.bundle.display()))?;
    let engine = StatisticsEngine::new(&data);
    let runner = RunnerId::new(args.runner.as_str());

    let mut stats = engine.runner_statistics(&runner, args.filter.into())?;

    if let (Some(path), Some(course_start)) = (&args.gpx, args.course_start) {
        let bytes = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        let track = read_track(&bytes)
            .map_err(|e| anyhow::anyhow!("Failed to read track {}: {e}", path.display()))?;
        if verbose {
            eprintln!(
                "Track: {} s from {}, {:.0} m",
                track.summary.duration_s, track.start, track.summary.distance_m
            );
        }
        stats.attach_geo(engine.geo_statistics(&runner, &track, course_start)?);
    }

    match format {
        OutputFormat::Text => print_text(&data, &stats),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Tsv => print_tsv(&stats),
    }

    Ok(())
}

fn print_text(data: &EventData, stats: &RunnerStatistics) {
    let name = data
        .runner(&stats.runner)
        .map_or_else(|| stats.runner.to_string(), |r| format!("{} {}", r.surname, r.name));
    println!("{name} ({}, course {})", stats.group, stats.course);
    if stats.finished {
        println!("   Result: {} (place {})", format_seconds(stats.result), stats.place);
    } else {
        println!("   Result: DNF");
    }

    println!();
    println!(
        "   {:<10} {:>9} {:>9} {:>5} {:>7}",
        "leg", "split", "total", "rank", "behind"
    );
    for leg in &stats.legs {
        let rank = leg.place.map_or_else(|| "-".to_string(), |p| p.to_string());
        let backlog = leg.backlog.map_or_else(|| "-".to_string(), |b| format!("{b:+}"));
        print!(
            "   {:<10} {:>9} {:>9} {:>5} {:>7}",
            leg.leg.as_str(),
            show_seconds(leg.split),
            show_seconds(leg.cumulative),
            rank,
            backlog
        );
        if let Some(geo) = &leg.geo {
            print!(
                "  {:.0} m direct, {:.0} m run, +{:.0} m",
                geo.length_m, geo.path_m, geo.elevation_gain_m
            );
        }
        println!();
    }
}

fn print_tsv(stats: &RunnerStatistics) {
    println!("leg\tsplit\tcumulative\tplace\tbacklog\tlength_m\tpath_m\televation_gain_m");
    for leg in &stats.legs {
        let opt = |v: Option<String>| v.unwrap_or_default();
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            leg.leg,
            opt(leg.split.map(|s| s.to_string())),
            opt(leg.cumulative.map(|s| s.to_string())),
            opt(leg.place.map(|p| p.to_string())),
            opt(leg.backlog.map(|b| b.to_string())),
            opt(leg.geo.map(|g| format!("{:.1}", g.length_m))),
            opt(leg.geo.map(|g| format!("{:.1}", g.path_m))),
            opt(leg.geo.map(|g| format!("{:.1}", g.elevation_gain_m))),
        );
    }
}
