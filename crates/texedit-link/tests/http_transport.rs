//! End-to-end checks of the HTTP transport against a fake backend.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use texedit_link::test_support::{CannedResponse, FakeBackend};
use texedit_link::{
    BackendTransport, ConnectionState, ConnectivityMonitor, HttpTransport, MonitorSettings,
    TransportError, USER_AGENT,
};

fn transport_for(backend: &FakeBackend) -> Result<HttpTransport> {
    HttpTransport::new(
        backend.endpoint(),
        Duration::from_secs(2),
        Duration::from_secs(2),
    )
    .context("build transport")
}

#[tokio::test]
async fn health_probe_accepts_success_status() -> Result<()> {
    let backend = FakeBackend::spawn([("GET /health", CannedResponse::ok(r#"{"status":"ok"}"#))])
        .await
        .context("spawn fake backend")?;
    let transport = transport_for(&backend)?;

    transport.probe_health().await.context("probe")?;

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests.first().map(|request| request.path.as_str()), Some("/health"));
    Ok(())
}

#[tokio::test]
async fn health_probe_rejects_error_status() -> Result<()> {
    let backend = FakeBackend::spawn([(
        "GET /health",
        CannedResponse::with_status(503, r#"{"status":"loading"}"#),
    )])
    .await
    .context("spawn fake backend")?;
    let transport = transport_for(&backend)?;

    let error = transport
        .probe_health()
        .await
        .expect_err("503 must count as unhealthy");

    assert!(matches!(error, TransportError::Status { status: 503, .. }));
    Ok(())
}

#[tokio::test]
async fn post_sends_json_with_headers() -> Result<()> {
    let backend = FakeBackend::spawn([(
        "POST /api/tone",
        CannedResponse::ok(r#"{"result":"Dear colleague"}"#),
    )])
    .await
    .context("spawn fake backend")?;
    let transport = transport_for(&backend)?;
    let payload = json!({"text": "hey you", "timestamp": 1_700_000_000});

    let body = transport.post_json("/api/tone", &payload).await?;

    let answer: Value = serde_json::from_slice(&body)?;
    assert_eq!(answer["result"], "Dear colleague");
    let requests = backend.requests();
    let request = requests.first().context("request recorded")?;
    assert_eq!(request.method, "POST");
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.header("user-agent"), Some(USER_AGENT));
    let sent: Value = serde_json::from_slice(&request.body)?;
    assert_eq!(sent, payload);
    Ok(())
}

#[tokio::test]
async fn refused_connection_is_a_send_error() -> Result<()> {
    let endpoint = {
        let backend = FakeBackend::spawn(Vec::<(String, CannedResponse)>::new())
            .await
            .context("spawn fake backend")?;
        backend.endpoint()
    };
    // Give the aborted listener a moment to close its socket.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let transport = HttpTransport::new(endpoint, Duration::from_secs(1), Duration::from_secs(1))?;

    let error = transport
        .probe_health()
        .await
        .expect_err("nothing listens on the port");

    assert!(matches!(error, TransportError::Send { .. }));
    Ok(())
}

#[tokio::test]
async fn monitor_connects_and_requests_over_http() -> Result<()> {
    let backend = FakeBackend::spawn([
        ("GET /health", CannedResponse::ok("{}")),
        ("POST /api/keywords", CannedResponse::ok(r#"{"result":"rust, http"}"#)),
    ])
    .await
    .context("spawn fake backend")?;
    let transport: Arc<dyn BackendTransport> = Arc::new(transport_for(&backend)?);
    let settings = MonitorSettings::new(Duration::from_millis(50), Duration::from_secs(2), 15);
    let monitor = ConnectivityMonitor::new(transport, settings);

    monitor.start_monitoring();
    monitor.wait_until_ready(Duration::from_secs(5)).await?;
    let object = monitor
        .request("/api/keywords", &json!({"text": "rust over http"}))
        .await?;
    monitor.stop_monitoring();

    assert_eq!(monitor.state(), ConnectionState::Connected);
    assert_eq!(object.get("result"), Some(&json!("rust, http")));
    Ok(())
}
