//! Command-line interface.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "thumbyard", version, about = "Daily YouTube thumbnail collection into a rotating, versioned dataset")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Increase log verbosity (-v: debug, -vv: trace). RUST_LOG wins when set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// `thumbyard` with no subcommand means `thumbyard run`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Run(RunArgs::default()))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daily collection (the default when no subcommand is given).
    Run(RunArgs),
}

#[derive(Debug, Default, clap::Args)]
pub struct RunArgs {
    /// Path to the config file (default: ./thumbyard.toml, then the
    /// platform config directory).
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only consider videos published within the last N days.
    #[arg(long, value_name = "N")]
    pub days_ago: Option<u32>,

    /// Candidates to keep per topic category.
    #[arg(long, value_name = "N")]
    pub videos_per_category: Option<usize>,

    /// Dataset root directory (overrides dataset.root).
    #[arg(long, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Collect and rotate, but don't mirror to the remote bucket.
    #[arg(long)]
    pub skip_publish: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_invocation_defaults_to_run() {
        let args = Args::try_parse_from(["thumbyard"]).unwrap();
        assert!(matches!(args.into_command(), Command::Run(_)));
    }

    #[test]
    fn test_run_overrides() {
        let args = Args::try_parse_from([
            "thumbyard",
            "run",
            "--days-ago",
            "3",
            "--videos-per-category",
            "2",
            "--data-dir",
            "/tmp/dataset",
            "--skip-publish",
        ])
        .unwrap();
        let Command::Run(run) = args.into_command();
        assert_eq!(run.days_ago, Some(3));
        assert_eq!(run.videos_per_category, Some(2));
        assert_eq!(run.data_dir.as_deref(), Some(std::path::Path::new("/tmp/dataset")));
        assert!(run.skip_publish);
    }

    #[test]
    fn test_verbosity_counts() {
        let args = Args::try_parse_from(["thumbyard", "-vv", "run"]).unwrap();
        assert_eq!(args.verbose, 2);
    }
}
