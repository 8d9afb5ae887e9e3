use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::StreamExt;
use ipo_logging::{ipo_debug, ipo_info, ipo_warn};
use reqwest::header::CONTENT_TYPE;

use crate::decode::decode_markup;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::{FailureKind, FetchError, FetchMetadata, FetchOutput};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (1-based), doubling each time.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
                .to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Write-only destination for the raw markup of a successful fetch.
/// Diagnostics only: a failing sink never fails the fetch.
pub trait SnapshotSink: Send + Sync {
    fn store(&self, markup: &str) -> Result<(), PersistError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSnapshotSink;

impl SnapshotSink for NullSnapshotSink {
    fn store(&self, _markup: &str) -> Result<(), PersistError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FileSnapshotSink {
    writer: AtomicFileWriter,
}

impl FileSnapshotSink {
    pub fn new(path: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(path),
        }
    }
}

impl SnapshotSink for FileSnapshotSink {
    fn store(&self, markup: &str) -> Result<(), PersistError> {
        self.writer.write(markup)?;
        ipo_debug!("Saved listing snapshot to {:?}", self.writer.target());
        Ok(())
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, sink: &dyn SnapshotSink) -> Result<FetchOutput, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self, redirect_counter: Arc<AtomicUsize>) -> Result<reqwest::Client, FetchError> {
        let redirect_limit = self.settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let count = attempt.previous().len();
            redirect_counter.store(count, Ordering::Relaxed);
            if count >= redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });

        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .user_agent(self.settings.user_agent.as_str())
            .redirect(policy)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }

    async fn fetch_once(&self, parsed: &reqwest::Url) -> Result<FetchOutput, FetchError> {
        let redirect_counter = Arc::new(AtomicUsize::new(0));
        let client = self.build_client(redirect_counter.clone())?;

        let response = client
            .get(parsed.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(FetchError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        let decoded = decode_markup(&bytes, content_type.as_deref())
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;

        Ok(FetchOutput {
            markup: decoded.markup,
            metadata: FetchMetadata {
                original_url: parsed.to_string(),
                final_url,
                redirect_count: redirect_counter.load(Ordering::Relaxed),
                content_type,
                encoding_label: decoded.encoding_label,
                byte_len: bytes.len() as u64,
                attempts: 1,
            },
        })
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, sink: &dyn SnapshotSink) -> Result<FetchOutput, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let retry = &self.settings.retry;
        let max_attempts = retry.max_attempts.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(&parsed).await {
                Ok(mut output) => {
                    output.metadata.attempts = attempt;
                    ipo_info!(
                        "Fetched {} ({} bytes, {}) after {} attempt(s)",
                        output.metadata.final_url,
                        output.metadata.byte_len,
                        output.metadata.encoding_label,
                        attempt
                    );
                    if let Err(err) = sink.store(&output.markup) {
                        ipo_warn!("Could not save listing snapshot: {}", err);
                    }
                    return Ok(output);
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let backoff = retry.backoff_after(attempt);
                    ipo_warn!(
                        "Fetch attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        max_attempts,
                        url,
                        err,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err.after_attempts(attempt)),
            }
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
