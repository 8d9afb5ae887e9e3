use crate::{IpoId, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    /// Execute everything except the actual send and the history update.
    pub dry_run: bool,
    /// Ignore history and notify every eligible listing again.
    pub force: bool,
    /// Also notify listings whose status column is not "Open".
    pub include_closed: bool,
}

/// Errors collected over one run. Per-record errors are reported alongside
/// successful work; fatal ones end the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    #[error("fetch failed: {message}")]
    Fetch { message: String },
    #[error("listing page could not be parsed: {message}")]
    Page { message: String },
    #[error("row {row} skipped: {reason}")]
    Parse { row: usize, reason: String },
    #[error("mail authentication failed: {message}")]
    Auth { message: String },
    #[error("sending {ipo} to {recipient} failed: {message}")]
    Send {
        ipo: IpoId,
        recipient: String,
        message: String,
    },
    #[error("history store error: {message}")]
    Store { message: String },
}

impl RunError {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RunError::Fetch { .. }
                | RunError::Page { .. }
                | RunError::Auth { .. }
                | RunError::Store { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// Completed, but something deserves attention (rejected rows, partial sends,
    /// an empty page).
    Warning,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunResult {
    /// Valid listings parsed from the page.
    pub found: usize,
    /// Listings notified in this run (would-be notifications on a dry run).
    pub notified: usize,
    /// Listings skipped because history already had them.
    pub skipped: usize,
    /// Listings skipped because their status was not "Open".
    pub skipped_not_open: usize,
    pub notified_ids: Vec<IpoId>,
    pub failed_ids: Vec<IpoId>,
    pub errors: Vec<RunError>,
    pub warnings: Vec<String>,
    pub stage: Stage,
    pub dry_run: bool,
}

impl RunResult {
    pub fn parse_errors(&self) -> usize {
        self.errors
            .iter()
            .filter(|err| matches!(err, RunError::Parse { .. }))
            .count()
    }

    pub fn has_fatal_error(&self) -> bool {
        self.errors.iter().any(RunError::is_fatal)
    }

    /// Fraction of attempted listings that reached no recipient.
    pub fn failure_ratio(&self) -> f64 {
        let attempted = self.notified + self.failed_ids.len();
        if attempted == 0 {
            return 0.0;
        }
        self.failed_ids.len() as f64 / attempted as f64
    }

    pub fn status(&self) -> RunStatus {
        if self.stage == Stage::Failed || self.has_fatal_error() {
            RunStatus::Failed
        } else if !self.errors.is_empty() || !self.warnings.is_empty() {
            RunStatus::Warning
        } else {
            RunStatus::Success
        }
    }

    /// Process exit code: nonzero on a fatal error or when failed sends exceed
    /// `max_failure_ratio` of the attempts.
    pub fn exit_code(&self, max_failure_ratio: f64) -> i32 {
        if self.status() == RunStatus::Failed || self.failure_ratio() > max_failure_ratio {
            1
        } else {
            0
        }
    }
}
