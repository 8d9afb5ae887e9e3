mod commands;
mod config;
mod logging;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ipo_core::RunOptions;

use crate::config::AppConfig;
use crate::logging::LogDestination;

/// Exit status for configuration errors, distinct from run failures.
const CONFIG_ERROR: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "ipo_alert", version, about = "Emails new IPO listings once each")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch the listing page and notify recipients of new open IPOs.
    Run {
        /// Do everything except sending mail and updating history.
        #[arg(long)]
        dry_run: bool,
        /// Notify listings already present in history again.
        #[arg(long)]
        force: bool,
        /// Also notify listings that are not currently open.
        #[arg(long)]
        include_closed: bool,
    },
    /// Check configuration, mail credentials, the source page and history.
    Health,
    /// Show history and configuration statistics.
    Stats,
    /// Remove history entries older than the retention window.
    Cleanup {
        /// Age threshold in days; defaults to HISTORY_RETENTION_DAYS.
        #[arg(long)]
        days: Option<u32>,
    },
}

impl Command {
    fn sends_mail(&self) -> bool {
        matches!(self, Command::Run { .. } | Command::Health)
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {err:#}");
            return ExitCode::from(CONFIG_ERROR);
        }
    };
    if cli.command.sends_mail() {
        if let Err(err) = config.mail() {
            eprintln!("Configuration error: {err:#}");
            return ExitCode::from(CONFIG_ERROR);
        }
    }
    logging::initialize(
        LogDestination::from_file(config.log_file.as_deref()),
        config.log_level,
    );

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Could not start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = match cli.command {
        Command::Run {
            dry_run,
            force,
            include_closed,
        } => runtime.block_on(commands::run(
            &config,
            RunOptions {
                dry_run,
                force,
                include_closed,
            },
        )),
        Command::Health => runtime.block_on(commands::health(&config)),
        Command::Stats => commands::stats(&config),
        Command::Cleanup { days } => commands::cleanup(&config, days),
    };

    match outcome {
        Ok(0) => ExitCode::SUCCESS,
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            ipo_logging::ipo_error!("{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
