mod cli;
mod error;
mod run;

use clap::Parser;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Args::parse();
    init_tracing(args.verbose);

    match args.into_command() {
        cli::Command::Run(run_args) => match run::daily_run(&run_args).await {
            Ok(_) => ExitCode::SUCCESS,
            // The scheduler reads the exit code; the humans read the log.
            Err(err) => {
                error!(error = %err, detail = ?err, "daily run failed");
                ExitCode::FAILURE
            },
        },
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
