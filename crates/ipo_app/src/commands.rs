use std::fmt::Write;

use anyhow::Context;
use chrono::Utc;
use ipo_core::{RunOptions, RunResult};
use ipo_engine::{
    Engine, FetchSettings, FileSnapshotSink, HealthProbe, HealthReport, HistoryStore,
    JsonFileBackend, MailTransport, Notifier, NotifierSettings, NullSnapshotSink, ReqwestFetcher,
    ResendMailTransport, RetryPolicy, SmtpMailTransport, SnapshotSink, StoreStats,
    TableListingParser,
};
use ipo_logging::{ipo_error, ipo_info};

use crate::config::{AppConfig, MailConfig};

fn build_transport(mail: &MailConfig) -> anyhow::Result<Box<dyn MailTransport>> {
    let transport: Box<dyn MailTransport> = match mail {
        MailConfig::Smtp(settings) => Box::new(SmtpMailTransport::new(settings)?),
        MailConfig::Resend(settings) => Box::new(ResendMailTransport::new(settings.clone())?),
    };
    Ok(transport)
}

fn load_store(config: &AppConfig) -> anyhow::Result<HistoryStore<JsonFileBackend>> {
    HistoryStore::load(JsonFileBackend::new(config.history_path.clone()))
        .with_context(|| format!("loading history from {:?}", config.history_path))
}

pub async fn run(config: &AppConfig, options: RunOptions) -> anyhow::Result<i32> {
    let store = load_store(config)?;
    let transport = build_transport(config.mail()?)?;
    let notifier = Notifier::new(transport, NotifierSettings::new(config.recipients.clone()));
    let snapshot: Box<dyn SnapshotSink> = match &config.data_path {
        Some(path) => Box::new(FileSnapshotSink::new(path.clone())),
        None => Box::new(NullSnapshotSink),
    };

    let mut engine = Engine::new(
        Box::new(ReqwestFetcher::new(FetchSettings::default())),
        config.source_url.clone(),
        Box::new(TableListingParser::default()),
        store,
        notifier,
    )
    .with_snapshot_sink(snapshot);

    let result = engine.run(options).await;
    drop(engine);

    print!("{}", format_summary(&result));
    let code = result.exit_code(config.max_failure_ratio);
    if code != 0 {
        ipo_error!(
            "Run failed (failure ratio {:.2}, tolerated {:.2})",
            result.failure_ratio(),
            config.max_failure_ratio
        );
    }
    Ok(code)
}

pub async fn health(config: &AppConfig) -> anyhow::Result<i32> {
    let mut report = HealthReport::default();
    report.push(
        "config",
        Ok(format!(
            "{} recipient(s), {} transport, source {}",
            config.recipients.len(),
            config.transport_name(),
            config.source_url
        )),
    );

    let transport = build_transport(config.mail()?)?;
    let fetcher = ReqwestFetcher::new(FetchSettings {
        retry: RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        },
        ..FetchSettings::default()
    });
    let backend = JsonFileBackend::new(config.history_path.clone());

    let report = HealthProbe {
        fetcher: &fetcher,
        source_url: &config.source_url,
        transport: transport.as_ref(),
        backend: &backend,
    }
    .run(report)
    .await;

    for check in &report.checks {
        println!("{check}");
    }
    let healthy = report.is_healthy();
    ipo_info!("Health check {}", if healthy { "passed" } else { "failed" });
    Ok(if healthy { 0 } else { 1 })
}

pub fn stats(config: &AppConfig) -> anyhow::Result<i32> {
    let store = load_store(config)?;
    print!("{}", format_stats(&store.stats(), config));
    Ok(0)
}

pub fn cleanup(config: &AppConfig, days: Option<u32>) -> anyhow::Result<i32> {
    let days = days.unwrap_or(config.retention_days);
    let mut store = load_store(config)?;
    let removed = store.cleanup(days, Utc::now());
    store
        .persist()
        .with_context(|| format!("writing history to {:?}", config.history_path))?;
    ipo_info!("Removed {} entries older than {} day(s)", removed, days);
    println!(
        "Removed {removed} entr{} older than {days} day(s); {} remain",
        if removed == 1 { "y" } else { "ies" },
        store.history().len()
    );
    Ok(0)
}

fn format_summary(result: &RunResult) -> String {
    let mut out = String::new();
    let mode = if result.dry_run { " (dry run)" } else { "" };
    let _ = writeln!(out, "IPO alert run{mode}: {:?}", result.status());
    let _ = writeln!(out, "  found:       {}", result.found);
    let _ = writeln!(out, "  notified:    {}", result.notified);
    let _ = writeln!(out, "  skipped:     {} already notified", result.skipped);
    if result.skipped_not_open > 0 {
        let _ = writeln!(out, "  not open:    {}", result.skipped_not_open);
    }
    if !result.failed_ids.is_empty() {
        let _ = writeln!(out, "  failed:      {}", result.failed_ids.len());
    }
    for warning in &result.warnings {
        let _ = writeln!(out, "  warning: {warning}");
    }
    for error in &result.errors {
        let _ = writeln!(out, "  error: {error}");
    }
    out
}

fn format_stats(stats: &StoreStats, config: &AppConfig) -> String {
    let timestamp = |ts: Option<chrono::DateTime<Utc>>| {
        ts.map(|ts| ts.to_rfc3339()).unwrap_or_else(|| "-".to_string())
    };
    let mut out = String::new();
    let _ = writeln!(out, "History: {}", stats.location);
    let _ = writeln!(out, "  entries:        {}", stats.history.total);
    let _ = writeln!(out, "  first notified: {}", timestamp(stats.history.first_notified));
    let _ = writeln!(out, "  last notified:  {}", timestamp(stats.history.last_notified));
    let _ = writeln!(
        out,
        "  size:           {}",
        stats
            .size_bytes
            .map(|bytes| format!("{bytes} bytes"))
            .unwrap_or_else(|| "-".to_string())
    );
    let _ = writeln!(out, "Configuration:");
    let _ = writeln!(out, "  source:         {}", config.source_url);
    let _ = writeln!(out, "  sender:         {}", config.email_address);
    let _ = writeln!(out, "  recipients:     {}", config.recipients.len());
    let _ = writeln!(out, "  transport:      {}", config.transport_name());
    let _ = writeln!(out, "  retention days: {}", config.retention_days);
    out
}

#[cfg(test)]
mod tests {
    use ipo_core::{IpoId, RunError, Stage};

    use super::*;

    #[test]
    fn summary_lists_counts_and_errors() {
        let result = RunResult {
            found: 3,
            notified: 1,
            skipped: 1,
            failed_ids: vec![IpoId::from_raw("beta@2024-01-11")],
            errors: vec![RunError::Parse {
                row: 4,
                reason: "missing close date".to_string(),
            }],
            stage: Stage::Done,
            ..RunResult::default()
        };

        let summary = format_summary(&result);
        assert!(summary.starts_with("IPO alert run: Warning\n"));
        assert!(summary.contains("  notified:    1\n"));
        assert!(summary.contains("  failed:      1\n"));
        assert!(summary.contains("  error: row 4 skipped: missing close date\n"));
        assert!(!summary.contains("not open"));
    }

    #[test]
    fn dry_run_is_marked_in_summary() {
        let result = RunResult {
            dry_run: true,
            stage: Stage::Done,
            ..RunResult::default()
        };
        assert!(format_summary(&result).starts_with("IPO alert run (dry run): Success\n"));
    }
}
