//! IPO alert core: listing records, notification history and the pure
//! pipeline state machine.
mod delivery;
mod effect;
mod history;
mod message;
mod msg;
mod record;
mod run;
mod state;
mod update;

pub use delivery::{DeliveryReport, RecipientFailure};
pub use effect::Effect;
pub use history::{HistoryEntry, HistoryStats, NotificationHistory};
pub use message::{compose_notification, EmailMessage, APPLICATION_PORTAL_URL};
pub use msg::Msg;
pub use record::{
    normalize_company_name, IpoId, IpoRecord, ParsedListings, RecordError, RowRejection,
};
pub use run::{RunError, RunOptions, RunResult, RunStatus};
pub use state::{PipelineState, Stage};
pub use update::update;
