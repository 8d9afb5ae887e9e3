//! Environment-driven configuration for the `ipo_alert` binary.

use std::path::PathBuf;

use anyhow::{bail, Context};
use ipo_engine::{ResendSettings, SmtpSettings};
use log::LevelFilter;
use secrecy::SecretString;

pub const DEFAULT_SOURCE_URL: &str = "https://www.sharesansar.com";
pub const DEFAULT_DATA_PATH: &str = "data/share.html";
pub const DEFAULT_HISTORY_FILE: &str = "data/ipo_history.json";
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

const MISSING_MAIL: &str = "APP_PASSWORD is required unless the Resend API is configured";

#[derive(Debug, Clone)]
pub enum MailConfig {
    Smtp(SmtpSettings),
    Resend(ResendSettings),
}

impl MailConfig {
    pub fn transport_name(&self) -> &'static str {
        match self {
            MailConfig::Smtp(_) => "smtp",
            MailConfig::Resend(_) => "resend",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub email_address: String,
    pub recipients: Vec<String>,
    pub source_url: String,
    /// Raw page snapshot; `None` when disabled with an empty `DATA_PATH`.
    pub data_path: Option<PathBuf>,
    pub history_path: PathBuf,
    pub retention_days: u32,
    pub log_level: LevelFilter,
    pub log_file: Option<PathBuf>,
    /// `None` when no mail credentials are set; only sending commands need them.
    pub mail: Option<MailConfig>,
    pub max_failure_ratio: f64,
}

impl AppConfig {
    pub fn mail(&self) -> anyhow::Result<&MailConfig> {
        self.mail.as_ref().context(MISSING_MAIL)
    }

    pub fn transport_name(&self) -> &'static str {
        self.mail.as_ref().map_or("none", MailConfig::transport_name)
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds and validates the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let email_address = get("EMAIL_ADDRESS").context("EMAIL_ADDRESS is required")?;
        ensure_address("EMAIL_ADDRESS", &email_address)?;

        let recipients = parse_recipients(
            &get("RECIPIENT_EMAIL_LIST").context("RECIPIENT_EMAIL_LIST is required")?,
        )?;

        let source_url = get("SOURCE_URL").unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string());
        let parsed = url::Url::parse(&source_url)
            .with_context(|| format!("SOURCE_URL {source_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("SOURCE_URL must use http or https, got {:?}", parsed.scheme());
        }

        // Set but empty disables the snapshot.
        let data_path = match lookup("DATA_PATH") {
            Some(value) if value.trim().is_empty() => None,
            Some(value) => Some(PathBuf::from(value.trim())),
            None => Some(PathBuf::from(DEFAULT_DATA_PATH)),
        };
        let history_path = PathBuf::from(
            get("NOTIFIED_IPOS_FILE").unwrap_or_else(|| DEFAULT_HISTORY_FILE.to_string()),
        );

        let retention_days = match get("HISTORY_RETENTION_DAYS") {
            Some(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("HISTORY_RETENTION_DAYS {raw:?} is not a day count"))?,
            None => DEFAULT_RETENTION_DAYS,
        };

        let log_level = match get("LOG_LEVEL") {
            Some(raw) => ipo_logging::parse_level(&raw)
                .with_context(|| format!("LOG_LEVEL {raw:?} is not a log level"))?,
            None => LevelFilter::Info,
        };
        let log_file = get("LOG_FILE").map(PathBuf::from);

        let max_failure_ratio = match get("MAX_FAILURE_RATIO") {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|ratio| (0.0..=1.0).contains(ratio))
                .with_context(|| format!("MAX_FAILURE_RATIO {raw:?} must be between 0 and 1"))?,
            None => 0.0,
        };

        let mail = match (get("RESEND_API_KEY"), get("RESEND_FROM_EMAIL")) {
            (Some(key), Some(from)) => {
                ensure_address("RESEND_FROM_EMAIL", &from)?;
                Some(MailConfig::Resend(ResendSettings::new(
                    SecretString::new(key),
                    from,
                )))
            }
            (Some(_), None) => bail!("RESEND_API_KEY is set but RESEND_FROM_EMAIL is missing"),
            _ => match get("APP_PASSWORD") {
                None => None,
                Some(password) => {
                    let mut smtp =
                        SmtpSettings::gmail(email_address.clone(), SecretString::new(password));
                    if let Some(host) = get("SMTP_HOST") {
                        smtp.host = host;
                    }
                    if let Some(raw) = get("SMTP_PORT") {
                        smtp.port = raw
                            .parse()
                            .with_context(|| format!("SMTP_PORT {raw:?} is not a port"))?;
                    }
                    Some(MailConfig::Smtp(smtp))
                }
            },
        };

        Ok(Self {
            email_address,
            recipients,
            source_url,
            data_path,
            history_path,
            retention_days,
            log_level,
            log_file,
            mail,
            max_failure_ratio,
        })
    }
}

fn parse_recipients(raw: &str) -> anyhow::Result<Vec<String>> {
    let mut recipients: Vec<String> = Vec::new();
    for address in raw.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        ensure_address("RECIPIENT_EMAIL_LIST", address)?;
        if !recipients.iter().any(|known| known.eq_ignore_ascii_case(address)) {
            recipients.push(address.to_string());
        }
    }
    if recipients.is_empty() {
        bail!("RECIPIENT_EMAIL_LIST must name at least one recipient");
    }
    Ok(recipients)
}

fn ensure_address(key: &str, address: &str) -> anyhow::Result<()> {
    match address.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => bail!("{key} contains an invalid address {address:?}"),
    }
}
