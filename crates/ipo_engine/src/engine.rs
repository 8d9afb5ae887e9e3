use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ipo_core::{update, Effect, Msg, PipelineState, RunOptions, RunResult};
use ipo_logging::{ipo_debug, ipo_error, ipo_info, ipo_warn};

use crate::fetch::{Fetcher, NullSnapshotSink, SnapshotSink};
use crate::notify::{Notifier, NotifyError};
use crate::parse::ListingParser;
use crate::store::{HistoryBackend, HistoryStore};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Executes pipeline effects against real collaborators and feeds the
/// outcomes back into [`ipo_core::update`] until the run ends.
pub struct Engine<B: HistoryBackend> {
    fetcher: Box<dyn Fetcher>,
    source_url: String,
    parser: Box<dyn ListingParser>,
    store: HistoryStore<B>,
    notifier: Notifier,
    snapshot: Box<dyn SnapshotSink>,
    clock: Clock,
}

impl<B: HistoryBackend> Engine<B> {
    pub fn new(
        fetcher: Box<dyn Fetcher>,
        source_url: impl Into<String>,
        parser: Box<dyn ListingParser>,
        store: HistoryStore<B>,
        notifier: Notifier,
    ) -> Self {
        Self {
            fetcher,
            source_url: source_url.into(),
            parser,
            store,
            notifier,
            snapshot: Box::new(NullSnapshotSink),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_snapshot_sink(mut self, sink: Box<dyn SnapshotSink>) -> Self {
        self.snapshot = sink;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub async fn run(&mut self, options: RunOptions) -> RunResult {
        ipo_info!(
            "Starting run against {} (dry_run={}, force={}, include_closed={})",
            self.source_url,
            options.dry_run,
            options.force,
            options.include_closed
        );
        let start = Msg::Start {
            options,
            notified: self.store.notified_ids(),
        };
        let (mut state, effects) = update(PipelineState::new(), start);
        let mut queue: VecDeque<Effect> = effects.into();

        while let Some(effect) = queue.pop_front() {
            // A terminal state discards whatever was queued behind the failure.
            if state.stage().is_terminal() {
                break;
            }
            let Some(msg) = self.execute(effect, &state).await else {
                continue;
            };
            let (next, effects) = update(state, msg);
            state = next;
            queue.extend(effects);
        }

        let result = state.result();
        log_summary(&result);
        result
    }

    async fn execute(&mut self, effect: Effect, state: &PipelineState) -> Option<Msg> {
        match effect {
            Effect::Fetch => {
                let result = self
                    .fetcher
                    .fetch(&self.source_url, self.snapshot.as_ref())
                    .await
                    .map(|output| output.markup)
                    .map_err(|err| {
                        ipo_error!("Fetching {} failed: {}", self.source_url, err);
                        err.to_string()
                    });
                Some(Msg::Fetched(result))
            }
            Effect::Parse { markup } => {
                let result = self.parser.parse(&markup).map_err(|err| {
                    ipo_error!("Listing page rejected: {}", err);
                    err.to_string()
                });
                Some(Msg::Parsed(result))
            }
            Effect::Notify { record } => {
                let id = record.id().clone();
                if state.options().dry_run {
                    let report = self.notifier.simulate(&record);
                    return Some(Msg::Delivered { id, report });
                }
                match self.notifier.notify(&record).await {
                    Ok(report) => Some(Msg::Delivered { id, report }),
                    Err(NotifyError::Auth { message, report }) => {
                        if report.is_success() {
                            ipo_warn!(
                                "{} reached {} recipient(s) before authentication failed",
                                id,
                                report.delivered.len()
                            );
                        }
                        Some(Msg::AuthFailed {
                            id,
                            message,
                            report,
                        })
                    }
                }
            }
            Effect::MarkNotified { record } => {
                self.store.record_notification(&record, (self.clock)());
                match self.store.persist() {
                    Ok(()) => {
                        ipo_debug!("Checkpointed {} in history", record.id());
                        None
                    }
                    Err(err) => {
                        ipo_error!("Could not record {} in history: {}", record.id(), err);
                        Some(Msg::StoreFailed {
                            message: err.to_string(),
                        })
                    }
                }
            }
            Effect::PersistHistory => {
                let result = self.store.persist().map_err(|err| {
                    ipo_error!("Could not write history: {}", err);
                    err.to_string()
                });
                Some(Msg::Persisted(result))
            }
        }
    }
}

fn log_summary(result: &RunResult) {
    ipo_info!(
        "Run finished ({:?}): found={} notified={} skipped={} not_open={} failed={} parse_errors={}",
        result.status(),
        result.found,
        result.notified,
        result.skipped,
        result.skipped_not_open,
        result.failed_ids.len(),
        result.parse_errors()
    );
    for warning in &result.warnings {
        ipo_warn!("{}", warning);
    }
}
