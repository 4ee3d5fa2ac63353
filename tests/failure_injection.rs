//! Failure injection against real HTTP and TCP providers.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use provider_failover::lifecycle::Engine;
use provider_failover::{FailoverReason, HealthState};

mod common;

const WAIT: Duration = Duration::from_secs(10);
const KEY: &str = "integration-key";

async fn toggled_backend(healthy: Arc<AtomicBool>) -> std::net::SocketAddr {
    common::start_programmable_backend(move || {
        let healthy = healthy.clone();
        async move {
            if healthy.load(Ordering::SeqCst) {
                (200, "ok".into())
            } else {
                (503, "Service Unavailable".into())
            }
        }
    })
    .await
}

async fn admin_get(client: &reqwest::Client, engine: &Engine, path: &str) -> Value {
    let addr = engine.admin_addr().unwrap();
    client
        .get(format!("http://{}{}", addr, path))
        .bearer_auth(KEY)
        .send()
        .await
        .expect("admin API unreachable")
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_http_provider_failure_moves_traffic() {
    let primary_healthy = Arc::new(AtomicBool::new(true));
    let primary = toggled_backend(primary_healthy.clone()).await;
    let backup = common::start_programmable_backend(|| async { (200, "ok".to_string()) }).await;

    let mut config = common::fast_config([
        ("primary", format!("http://{}/health", primary)),
        ("backup", format!("http://{}/health", backup)),
    ]);
    config.admin.enabled = true;
    config.admin.bind_address = "127.0.0.1:0".into();
    config.admin.api_key = KEY.into();

    let engine = Engine::start(config).await.unwrap();
    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    let active = admin_get(&client, &engine, "/admin/active").await;
    assert_eq!(active["active"], "primary");

    primary_healthy.store(false, Ordering::SeqCst);
    let moved = common::wait_until(WAIT, || engine.handle().active().as_deref() == Some("backup")).await;
    assert!(moved, "traffic never left the failing provider");

    let events = admin_get(&client, &engine, "/admin/events").await;
    let switch = events.as_array().unwrap().last().unwrap();
    assert_eq!(switch["previous"], "primary");
    assert_eq!(switch["new_active"], "backup");
    assert_eq!(switch["reason"], "health-degradation");

    let providers = admin_get(&client, &engine, "/admin/providers").await;
    assert_eq!(providers[0]["state"], "down");
    assert!(providers[0]["last_outcome"]["reason"]
        .as_str()
        .unwrap()
        .contains("503"));

    // Primary comes back; backup keeps the traffic.
    primary_healthy.store(true, Ordering::SeqCst);
    let recovered = common::wait_until(WAIT, || {
        engine.registry().get("primary").unwrap().status().state == HealthState::Up
    })
    .await;
    assert!(recovered);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(engine.handle().active().as_deref(), Some("backup"));

    engine.shutdown().await;
}

#[tokio::test]
async fn test_hung_provider_times_out_without_blocking_others() {
    let hung = common::start_silent_backend().await;
    let healthy = common::start_programmable_backend(|| async { (200, "ok".to_string()) }).await;

    let config = common::fast_config([
        ("hung", format!("http://{}/health", hung)),
        ("healthy", format!("http://{}/health", healthy)),
    ]);
    let engine = Engine::start(config).await.unwrap();

    let moved = common::wait_until(WAIT, || engine.handle().active().as_deref() == Some("healthy")).await;
    assert!(moved);

    let hung_status = engine.registry().get("hung").unwrap().status();
    assert_eq!(hung_status.state, HealthState::Down);
    assert!(hung_status.last_outcome.as_ref().unwrap().reason.as_deref().unwrap().starts_with("timeout"));

    let healthy_status = engine.registry().get("healthy").unwrap().status();
    assert_eq!(healthy_status.state, HealthState::Up);
    assert!(healthy_status.consecutive_successes >= 2);

    // Shutdown abandons the probe stuck on the silent backend.
    tokio::time::timeout(Duration::from_secs(2), engine.shutdown())
        .await
        .expect("shutdown waited on a hung probe");
}

#[tokio::test]
async fn test_unreachable_tcp_providers_cause_total_outage() {
    let a = common::closed_port().await;
    let b = common::closed_port().await;

    let config = common::fast_config([
        ("a", format!("tcp://{}", a)),
        ("b", format!("tcp://{}", b)),
    ]);
    let engine = Engine::start(config).await.unwrap();

    let outage = common::wait_until(WAIT, || {
        engine
            .handle()
            .events()
            .last()
            .map(|e| e.new_active.is_none())
            .unwrap_or(false)
    })
    .await;
    assert!(outage);
    assert_eq!(engine.handle().active(), None);

    // Depending on probe timing, traffic may have briefly landed on b first.
    let event = engine.handle().events().last().unwrap();
    assert!(event.previous.is_some());
    assert_eq!(event.reason, FailoverReason::HealthDegradation);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_event_log_write_failure_does_not_block_decisions() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("events.jsonl");

    let primary_healthy = Arc::new(AtomicBool::new(true));
    let primary = toggled_backend(primary_healthy.clone()).await;
    let backup = common::start_programmable_backend(|| async { (200, "ok".to_string()) }).await;

    let mut config = common::fast_config([
        ("primary", format!("http://{}/health", primary)),
        ("backup", format!("http://{}/health", backup)),
    ]);
    config.event_log.path = Some(log_path.clone());
    config.event_log.retry_base_delay_ms = 20;
    config.event_log.retry_max_delay_ms = 100;

    let engine = Engine::start(config).await.unwrap();

    // Nothing has been logged yet; a directory in the file's place makes every write fail.
    assert!(!log_path.exists());
    std::fs::create_dir(&log_path).unwrap();

    primary_healthy.store(false, Ordering::SeqCst);
    let moved = common::wait_until(WAIT, || engine.handle().active().as_deref() == Some("backup")).await;
    assert!(moved, "decision blocked by failing event log");
    assert!(engine.handle().snapshot().events_pending > 0);

    // Storage comes back; the queued event is persisted by the retry timer.
    std::fs::remove_dir(&log_path).unwrap();
    let flushed = common::wait_until(WAIT, || engine.handle().snapshot().events_pending == 0).await;
    assert!(flushed);

    engine.shutdown().await;
    let contents = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(contents.lines().count(), 1);
    assert!(contents.contains("\"new_active\":\"backup\""));
}
