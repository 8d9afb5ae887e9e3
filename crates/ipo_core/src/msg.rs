use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Begin a run against the identifiers already present in history.
    Start {
        options: crate::RunOptions,
        notified: BTreeSet<crate::IpoId>,
    },
    /// Fetcher finished: raw markup, or the error after retries ran out.
    Fetched(Result<String, String>),
    /// Parser finished: listings, or a page-level failure.
    Parsed(Result<crate::ParsedListings, String>),
    /// Notifier finished one listing.
    Delivered {
        id: crate::IpoId,
        report: crate::DeliveryReport,
    },
    /// The mail transport refused our credentials while sending this listing.
    /// `report` holds the recipients that accepted it before the refusal.
    AuthFailed {
        id: crate::IpoId,
        message: String,
        report: crate::DeliveryReport,
    },
    /// Recording a confirmed send in history failed.
    StoreFailed { message: String },
    /// Final history write-back finished.
    Persisted(Result<(), String>),
}
