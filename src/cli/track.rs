use std::path::PathBuf;

use clap::Args;

use crate::cli::OutputFormat;
use crate::core::types::format_seconds;
use crate::parsing::gpx::read_track;

#[derive(Args)]
pub struct TrackArgs {
    /// GPX file
    #[arg(required = true)]
    pub input: PathBuf,
}

/// Execute track subcommand
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds no timed points.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: TrackArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.input)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", args.input.display()))?;
    let track = read_track(&bytes)
        .map_err(|e| anyhow::anyhow!("Failed to read track {}: {e}", args.input.display()))?;
    let summary = &track.summary;

    if verbose {
        eprintln!("Resampled to {} points", track.len());
    }

    match format {
        OutputFormat::Text => {
            println!("Track {}", args.input.display());
            println!("   Start: {}", track.start.to_rfc3339());
            println!("   Duration: {}", format_seconds(summary.duration_s));
            println!("   Distance: {:.0} m", summary.distance_m);
            println!("   Climb: {:.0} m", summary.elevation_gain_m);
            println!(
                "   Start point: {:.6}, {:.6}",
                summary.start_point.lat, summary.start_point.lon
            );
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "start": track.start,
                "summary": summary,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("start\tduration_s\tdistance_m\televation_gain_m\tstart_lat\tstart_lon");
            println!(
                "{}\t{}\t{:.1}\t{:.1}\t{:.6}\t{:.6}",
                track.start.to_rfc3339(),
                summary.duration_s,
                summary.distance_m,
                summary.elevation_gain_m,
                summary.start_point.lat,
                summary.start_point.lon
            );
        }
    }

    Ok(())
}
