mod common;

use std::fs;

use common::ScriptedTransport;
use ipo_engine::{
    FetchSettings, HealthProbe, HealthReport, JsonFileBackend, MemoryBackend, ReqwestFetcher,
    RetryPolicy,
};
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> ReqwestFetcher {
    ReqwestFetcher::new(FetchSettings {
        retry: RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        },
        ..FetchSettings::default()
    })
}

fn config_ok() -> HealthReport {
    let mut report = HealthReport::default();
    report.push("config", Ok("2 recipient(s)".to_string()));
    report
}

#[tokio::test]
async fn all_checks_pass_against_healthy_dependencies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .mount(&server)
        .await;
    let fetcher = fetcher();
    let transport = ScriptedTransport::new();
    let backend = MemoryBackend::new();
    let url = server.uri();

    let report = HealthProbe {
        fetcher: &fetcher,
        source_url: &url,
        transport: &transport,
        backend: &backend,
    }
    .run(config_ok())
    .await;

    let names: Vec<&str> = report.checks.iter().map(|c| c.name).collect();
    assert_eq!(
        names,
        vec!["config", "mail_auth", "source_reachable", "store_accessible"]
    );
    assert!(report.is_healthy(), "{:?}", report.checks);
}

#[tokio::test]
async fn unreachable_source_and_corrupt_store_are_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ipo_history.json");
    fs::write(&path, "{broken").unwrap();

    let fetcher = fetcher();
    let transport = ScriptedTransport::new();
    let backend = JsonFileBackend::new(path);
    let url = server.uri();

    let report = HealthProbe {
        fetcher: &fetcher,
        source_url: &url,
        transport: &transport,
        backend: &backend,
    }
    .run(config_ok())
    .await;

    assert!(!report.is_healthy());
    assert!(report.check("mail_auth").unwrap().passed());
    assert!(!report.check("source_reachable").unwrap().passed());
    assert!(!report.check("store_accessible").unwrap().passed());
    assert!(report
        .check("store_accessible")
        .unwrap()
        .to_string()
        .starts_with("[fail] store_accessible"));
}

async fn store_check(backend: &dyn ipo_engine::HistoryBackend) -> ipo_engine::HealthCheck {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .mount(&server)
        .await;
    let fetcher = fetcher();
    let transport = ScriptedTransport::new();
    let url = server.uri();

    let report = HealthProbe {
        fetcher: &fetcher,
        source_url: &url,
        transport: &transport,
        backend,
    }
    .run(config_ok())
    .await;
    report.check("store_accessible").unwrap().clone()
}

#[tokio::test]
async fn readable_but_unwritable_store_fails_the_check() {
    let backend = MemoryBackend::new();
    backend.set_fail_writes(true);

    let check = store_check(&backend).await;
    assert!(!check.passed());
    assert_eq!(
        check.outcome,
        Err("history backend unavailable: writes disabled".to_string())
    );
    assert_eq!(backend.write_count(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn read_only_history_dir_fails_the_check() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");
    fs::create_dir(&dir).unwrap();
    let path = dir.join("ipo_history.json");
    fs::write(&path, "{}").unwrap();
    fs::set_permissions(&dir, fs::Permissions::from_mode(0o555)).unwrap();

    // Privileged users ignore directory permissions; nothing to observe then.
    let writable = fs::write(dir.join("canary"), "x").is_ok();
    let check = store_check(&JsonFileBackend::new(path)).await;
    fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
    if writable {
        assert!(check.passed());
        return;
    }

    assert!(!check.passed(), "{check}");
    assert!(check.to_string().contains("not writable"));
}
