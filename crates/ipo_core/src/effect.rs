#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Download the listing page.
    Fetch,
    /// Extract listings from downloaded markup.
    Parse { markup: String },
    /// Send the notification for one listing to every recipient.
    Notify { record: crate::IpoRecord },
    /// Record a confirmed send in history and checkpoint it.
    MarkNotified { record: crate::IpoRecord },
    /// Write history back to its backing resource.
    PersistHistory,
}
