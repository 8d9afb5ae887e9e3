use std::collections::{BTreeSet, VecDeque};

use crate::{DeliveryReport, IpoId, IpoRecord, RunError, RunOptions, RunResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    Fetching,
    Parsing,
    Filtering,
    Notifying,
    Persisting,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

/// Pipeline progress for a single run. Mutated only through [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineState {
    stage: Stage,
    options: RunOptions,
    known: BTreeSet<IpoId>,
    found: usize,
    skipped: usize,
    skipped_not_open: usize,
    pending: VecDeque<IpoRecord>,
    in_flight: Option<IpoRecord>,
    notified: Vec<IpoId>,
    marked: usize,
    failed: Vec<IpoId>,
    errors: Vec<RunError>,
    warnings: Vec<String>,
    aborted: bool,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// Listings still waiting for the notifier.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn result(&self) -> RunResult {
        RunResult {
            found: self.found,
            notified: self.notified.len(),
            skipped: self.skipped,
            skipped_not_open: self.skipped_not_open,
            notified_ids: self.notified.clone(),
            failed_ids: self.failed.clone(),
            errors: self.errors.clone(),
            warnings: self.warnings.clone(),
            stage: self.stage,
            dry_run: self.options.dry_run,
        }
    }

    pub(crate) fn begin(&mut self, options: RunOptions, known: BTreeSet<IpoId>) {
        self.options = options;
        self.known = known;
        self.stage = Stage::Fetching;
    }

    pub(crate) fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    pub(crate) fn fail(&mut self, error: RunError) {
        self.errors.push(error);
        self.pending.clear();
        self.in_flight = None;
        self.stage = Stage::Failed;
    }

    pub(crate) fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub(crate) fn push_error(&mut self, error: RunError) {
        self.errors.push(error);
    }

    /// Splits parsed listings into skipped and pending, in document order.
    pub(crate) fn filter(&mut self, records: Vec<IpoRecord>) {
        self.stage = Stage::Filtering;
        for record in records {
            self.found += 1;
            if !self.options.include_closed && !record.is_open() {
                self.skipped_not_open += 1;
            } else if !self.options.force && self.known.contains(record.id()) {
                self.skipped += 1;
            } else {
                self.pending.push_back(record);
            }
        }
    }

    pub(crate) fn take_next_pending(&mut self) -> Option<IpoRecord> {
        let record = self.pending.pop_front()?;
        self.in_flight = Some(record.clone());
        Some(record)
    }

    pub(crate) fn is_in_flight(&self, id: &IpoId) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|record| record.id() == id)
    }

    /// Applies one delivery; returns the record when history must record the send.
    pub(crate) fn apply_delivery(
        &mut self,
        id: IpoId,
        report: DeliveryReport,
    ) -> Option<IpoRecord> {
        let record = self.in_flight.take();
        for failure in report.failed.iter() {
            self.errors.push(RunError::Send {
                ipo: id.clone(),
                recipient: failure.recipient.clone(),
                message: failure.message.clone(),
            });
        }
        if report.is_success() {
            self.notified.push(id);
            if self.options.dry_run || report.simulated {
                return None;
            }
            self.marked += 1;
            record
        } else {
            self.failed.push(id);
            None
        }
    }

    /// Stops further sends after a run-level error raised mid-notification.
    pub(crate) fn abort_notifying(&mut self, error: RunError) {
        self.errors.push(error);
        self.pending.clear();
        self.in_flight = None;
        self.aborted = true;
    }

    pub(crate) fn has_marked(&self) -> bool {
        self.marked > 0
    }

    pub(crate) fn finish(&mut self) {
        self.stage = if self.aborted {
            Stage::Failed
        } else {
            Stage::Done
        };
    }
}
