#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientFailure {
    pub recipient: String,
    pub message: String,
}

/// Per-recipient outcome of sending one notification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    pub delivered: Vec<String>,
    pub failed: Vec<RecipientFailure>,
    /// Set when nothing reached the transport (dry-run).
    pub simulated: bool,
}

impl DeliveryReport {
    pub fn simulated(recipients: &[String]) -> Self {
        Self {
            delivered: recipients.to_vec(),
            failed: Vec::new(),
            simulated: true,
        }
    }

    /// A listing counts as notified once any recipient accepted it.
    pub fn is_success(&self) -> bool {
        !self.delivered.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        self.is_success() && !self.failed.is_empty()
    }
}
