//! Main entry point for the trimzip CLI application.

use clap::Parser;
use std::process::ExitCode;
use tracing::debug;

use trimzip::Cli;
use trimzip::batch::{self, Cancellation, ExitStatus};
use trimzip::logging::{Level, setup_logging};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(if cli.verbose {
        Level::Verbose
    } else {
        Level::Default
    });

    let options = cli.options();
    let files = match batch::collect_candidates(&cli.paths) {
        Ok(files) => files,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitStatus::Failure.into();
        }
    };
    debug!(count = files.len(), ?options, "collected candidates");

    let cancel = Cancellation::new();
    cancel.listen_for_ctrl_c();

    let (status, summary) = batch::run(&files, &options, &cancel).await;
    debug!(?summary, "batch finished");

    if !options.quiet {
        match status {
            ExitStatus::Cancelled => println!("Cancelled."),
            _ => println!("Completed."),
        }
    }

    status.into()
}
