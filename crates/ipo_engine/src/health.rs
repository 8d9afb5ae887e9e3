use std::fmt;

use ipo_logging::ipo_debug;

use crate::fetch::{Fetcher, NullSnapshotSink};
use crate::mail::MailTransport;
use crate::store::HistoryBackend;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    pub name: &'static str,
    pub outcome: Result<String, String>,
}

impl HealthCheck {
    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }
}

impl fmt::Display for HealthCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Ok(detail) => write!(f, "[ok]   {}: {}", self.name, detail),
            Err(detail) => write!(f, "[fail] {}: {}", self.name, detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HealthReport {
    pub checks: Vec<HealthCheck>,
}

impl HealthReport {
    pub fn push(&mut self, name: &'static str, outcome: Result<String, String>) {
        self.checks.push(HealthCheck { name, outcome });
    }

    pub fn is_healthy(&self) -> bool {
        self.checks.iter().all(HealthCheck::passed)
    }

    pub fn check(&self, name: &str) -> Option<&HealthCheck> {
        self.checks.iter().find(|check| check.name == name)
    }
}

/// Probes each external dependency once, without running the pipeline.
pub struct HealthProbe<'a> {
    pub fetcher: &'a dyn Fetcher,
    pub source_url: &'a str,
    pub transport: &'a dyn MailTransport,
    pub backend: &'a dyn HistoryBackend,
}

impl HealthProbe<'_> {
    /// Runs every probe; the report starts from `report`, which already holds
    /// the configuration check.
    pub async fn run(&self, mut report: HealthReport) -> HealthReport {
        let mail = self
            .transport
            .verify()
            .await
            .map(|()| format!("{} transport accepted credentials", self.transport.name()))
            .map_err(|err| err.to_string());
        report.push("mail_auth", mail);

        let source = self
            .fetcher
            .fetch(self.source_url, &NullSnapshotSink)
            .await
            .map(|output| {
                format!(
                    "{} answered with {} bytes",
                    output.metadata.final_url, output.metadata.byte_len
                )
            })
            .map_err(|err| err.to_string());
        report.push("source_reachable", source);

        let store = self
            .backend
            .read()
            .and_then(|history| self.backend.check_writable().map(|()| history.len()))
            .map(|entries| format!("{} entries at {}, writable", entries, self.backend.location()))
            .map_err(|err| err.to_string());
        report.push("store_accessible", store);

        ipo_debug!("Health checks: {:?}", report.checks);
        report
    }
}
