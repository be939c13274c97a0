use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod names;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match commands::run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let category = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<bnk_bank::BankError>())
                .map(|e| e.category())
                .unwrap_or("Error");
            eprintln!("{} {err:#}", format!("error[{category}]:").red().bold());
            ExitCode::FAILURE
        }
    }
}
