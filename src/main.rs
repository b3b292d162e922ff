use clap::Parser;
use tracing_subscriber::EnvFilter;

use orient_splits::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("orient_splits=debug,info")
    } else {
        EnvFilter::new("orient_splits=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        cli::Commands::Parse(args) => {
            cli::parse::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Leaderboard(args) => {
            cli::leaderboard::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Runner(args) => {
            cli::runner::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Group(args) => {
            cli::group::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Track(args) => {
            cli::track::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
