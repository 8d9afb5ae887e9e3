#![deny(missing_docs)]
//! Shared logging utilities for the IPO alert workspace.
//!
//! This crate provides the `ipo_*` logging macros used across the codebase,
//! the level-name parsing shared by configuration, and a minimal test
//! initializer for the global logger.
//!
//! Every macro logs under [`LOG_TARGET`], so loggers can keep pipeline
//! output while dropping HTTP and SMTP client chatter at debug levels.

use log::LevelFilter;

/// Target attached to every record emitted by the `ipo_*` macros.
pub const LOG_TARGET: &str = "ipo_alert";

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! ipo_trace {
    ($($arg:tt)*) => {{
        log::trace!(target: $crate::LOG_TARGET, $($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! ipo_debug {
    ($($arg:tt)*) => {{
        log::debug!(target: $crate::LOG_TARGET, $($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! ipo_info {
    ($($arg:tt)*) => {{
        log::info!(target: $crate::LOG_TARGET, $($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! ipo_warn {
    ($($arg:tt)*) => {{
        log::warn!(target: $crate::LOG_TARGET, $($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! ipo_error {
    ($($arg:tt)*) => {{
        log::error!(target: $crate::LOG_TARGET, $($arg)*);
    }};
}

/// Parses a verbosity name such as `INFO` or `debug` into a level filter.
///
/// `warning` is accepted as an alias of `warn`. Returns `None` for unknown names.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    match name.trim().to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        ConfigBuilder::new().add_filter_allow_str(LOG_TARGET).build(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use log::{Log, Metadata, Record};

    use super::*;

    struct Capture(Mutex<Vec<(String, String)>>);

    impl Log for Capture {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }
        fn log(&self, record: &Record<'_>) {
            self.0
                .lock()
                .unwrap()
                .push((record.target().to_string(), record.args().to_string()));
        }
        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture(Mutex::new(Vec::new()));

    #[test]
    fn macros_log_under_the_shared_target() {
        log::set_logger(&CAPTURE).unwrap();
        log::set_max_level(LevelFilter::Trace);

        ipo_info!("notified {} recipient(s)", 2);
        ipo_warn!("row {} skipped", 4);

        let captured = CAPTURE.0.lock().unwrap().clone();
        assert_eq!(
            captured,
            vec![
                (LOG_TARGET.to_string(), "notified 2 recipient(s)".to_string()),
                (LOG_TARGET.to_string(), "row 4 skipped".to_string()),
            ]
        );
    }

    #[test]
    fn parses_level_names_case_insensitively() {
        assert_eq!(parse_level("INFO"), Some(LevelFilter::Info));
        assert_eq!(parse_level(" Warning "), Some(LevelFilter::Warn));
        assert_eq!(parse_level("trace"), Some(LevelFilter::Trace));
        assert_eq!(parse_level("verbose"), None);
    }
}
