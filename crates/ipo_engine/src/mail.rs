use std::time::Duration;

use ipo_core::EmailMessage;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailError {
    /// Credentials refused; retrying within the same run cannot help.
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("temporary failure: {0}")]
    Transient(String),
    /// The transport refused this message or recipient for good.
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("transport misconfigured: {0}")]
    Config(String),
}

impl MailError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, MailError::Transient(_))
    }

    /// Errors that make every further send in this run pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MailError::Auth(_) | MailError::Config(_))
    }
}

/// An authenticated outbound mail service.
#[async_trait::async_trait]
pub trait MailTransport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Opens a session and authenticates without sending anything.
    async fn verify(&self) -> Result<(), MailError>;

    async fn send(&self, recipient: &str, message: &EmailMessage) -> Result<(), MailError>;
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from: String,
    pub timeout: Duration,
}

impl SmtpSettings {
    pub fn gmail(username: String, password: SecretString) -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            from: username.clone(),
            username,
            password,
            timeout: Duration::from_secs(30),
        }
    }
}

/// SMTP submission with STARTTLS; one connection per message.
pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailTransport {
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        let from = parse_mailbox(&settings.from)?;
        let credentials = Credentials::new(
            settings.username.clone(),
            settings.password.expose_secret().clone(),
        );
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|err| MailError::Config(err.to_string()))?
            .port(settings.port)
            .credentials(credentials)
            .timeout(Some(settings.timeout))
            .build();
        Ok(Self { mailer, from })
    }
}

#[async_trait::async_trait]
impl MailTransport for SmtpMailTransport {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn verify(&self) -> Result<(), MailError> {
        match self.mailer.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MailError::Transient("server did not answer NOOP".into())),
            Err(err) => Err(classify_smtp_error(err)),
        }
    }

    async fn send(&self, recipient: &str, message: &EmailMessage) -> Result<(), MailError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(recipient)?)
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|err| MailError::Rejected(err.to_string()))?;
        self.mailer
            .send(email)
            .await
            .map(|_| ())
            .map_err(classify_smtp_error)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse::<Mailbox>()
        .map_err(|err| MailError::Rejected(format!("invalid address {address:?}: {err}")))
}

fn classify_smtp_error(err: lettre::transport::smtp::Error) -> MailError {
    let text = err.to_string();
    let code = err.status().map(|code| code.to_string());
    if matches!(code.as_deref(), Some("530" | "534" | "535")) {
        return MailError::Auth(text);
    }
    if err.is_permanent() {
        MailError::Rejected(text)
    } else {
        MailError::Transient(text)
    }
}

#[derive(Debug, Clone)]
pub struct ResendSettings {
    pub api_url: String,
    pub api_key: SecretString,
    pub from: String,
    pub timeout: Duration,
}

impl ResendSettings {
    pub fn new(api_key: SecretString, from: String) -> Self {
        Self {
            api_url: "https://api.resend.com".to_string(),
            api_key,
            from,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Resend HTTP API.
pub struct ResendMailTransport {
    client: reqwest::Client,
    settings: ResendSettings,
}

impl ResendMailTransport {
    pub fn new(settings: ResendSettings) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| MailError::Config(err.to_string()))?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.api_url.trim_end_matches('/'), path)
    }
}

#[async_trait::async_trait]
impl MailTransport for ResendMailTransport {
    fn name(&self) -> &'static str {
        "resend"
    }

    async fn verify(&self) -> Result<(), MailError> {
        let response = self
            .client
            .get(self.endpoint("domains"))
            .bearer_auth(self.settings.api_key.expose_secret())
            .send()
            .await
            .map_err(|err| MailError::Transient(err.to_string()))?;
        match classify_status(response.status()) {
            None => Ok(()),
            Some(MailError::Rejected(detail)) => Err(MailError::Transient(detail)),
            Some(err) => Err(err),
        }
    }

    async fn send(&self, recipient: &str, message: &EmailMessage) -> Result<(), MailError> {
        let payload = json!({
            "from": self.settings.from,
            "to": [recipient],
            "subject": message.subject,
            "text": message.body,
        });
        let response = self
            .client
            .post(self.endpoint("emails"))
            .bearer_auth(self.settings.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|err| MailError::Transient(err.to_string()))?;

        let status = response.status();
        match classify_status(status) {
            None => Ok(()),
            Some(err) => {
                let body = response.text().await.unwrap_or_default();
                Err(match err {
                    MailError::Auth(s) => MailError::Auth(format!("{s}: {body}")),
                    MailError::Transient(s) => MailError::Transient(format!("{s}: {body}")),
                    MailError::Rejected(s) => MailError::Rejected(format!("{s}: {body}")),
                    other => other,
                })
            }
        }
    }
}

fn classify_status(status: StatusCode) -> Option<MailError> {
    if status.is_success() {
        return None;
    }
    let detail = format!("http status {}", status.as_u16());
    let err = if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        MailError::Auth(detail)
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        MailError::Transient(detail)
    } else {
        MailError::Rejected(detail)
    };
    Some(err)
}
