//! IPO alert engine: fetching, parsing, history persistence and mail
//! delivery, plus the runner that executes pipeline effects.
mod decode;
mod engine;
mod fetch;
mod health;
mod mail;
mod notify;
mod parse;
mod persist;
mod store;
mod types;

pub use decode::{decode_markup, DecodeError, DecodedMarkup};
pub use engine::{Clock, Engine};
pub use fetch::{
    FetchSettings, Fetcher, FileSnapshotSink, NullSnapshotSink, ReqwestFetcher, RetryPolicy,
    SnapshotSink,
};
pub use health::{HealthCheck, HealthProbe, HealthReport};
pub use mail::{
    MailError, MailTransport, ResendMailTransport, ResendSettings, SmtpMailTransport,
    SmtpSettings,
};
pub use notify::{Notifier, NotifierSettings, NotifyError};
pub use parse::{parse_date, ListingParseError, ListingParser, ParserSettings, TableListingParser};
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use store::{HistoryBackend, HistoryStore, JsonFileBackend, MemoryBackend, StoreError, StoreStats};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput};
