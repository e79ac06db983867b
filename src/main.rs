//! bookseek - Book metadata collections with generated-column indexes
//!
//! Imports book records into a JSON document store and keeps one
//! generated column plus secondary index per configured metadata field.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use bookseek::Result;
use bookseek::app::AppContext;
use bookseek::cli::Cli;
use bookseek::cli::output::{emit_robot, robot_error_structured};
use bookseek::error::BsError;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        // The partial report has already been written by the command.
        Err(BsError::PartialFailure { .. }) if cli.robot => ExitCode::FAILURE,
        Err(e) => {
            if cli.robot {
                if emit_robot(&robot_error_structured(&e)).is_err() {
                    eprintln!("Error: {e}");
                }
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let ctx = AppContext::from_cli(cli)?;
    bookseek::cli::commands::run(&ctx, &cli.command)
}

fn init_tracing(cli: &Cli) {
    if cli.quiet {
        return;
    }

    let filter = match cli.verbose {
        0 => "warn,bookseek=info",
        1 => "info,bookseek=debug",
        2 => "debug,bookseek=trace",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if cli.robot {
        // JSON logging for robot mode
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
