//! Logger initialization for the `ipo_alert` binary.
//!
//! Logs always go to the terminal; with `LOG_FILE` set they are also
//! appended to that file. Only records from the `ipo_*` macros are kept.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Destination for log output.
pub enum LogDestination {
    Terminal,
    /// Terminal plus a log file, appended to across runs.
    Both(PathBuf),
}

impl LogDestination {
    pub fn from_file(log_file: Option<&Path>) -> Self {
        match log_file {
            Some(path) => LogDestination::Both(path.to_path_buf()),
            None => LogDestination::Terminal,
        }
    }
}

/// Initialize the global logger. A file that cannot be opened is reported
/// on stderr and logging continues on the terminal only.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let LogDestination::Both(path) = destination {
        if let Some(file_logger) = create_file_logger(&path, level, config) {
            loggers.push(file_logger);
        }
    }

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .add_filter_allow_str(ipo_logging::LOG_TARGET)
        .build()
}

fn create_file_logger(
    path: &Path,
    level: LevelFilter,
    config: Config,
) -> Option<Box<WriteLogger<File>>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory {:?}: {}", parent, err);
            return None;
        }
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not open log file at {:?}: {}", path, err);
            None
        }
    }
}
