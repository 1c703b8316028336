//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - Query endpoints return what the ingestion pipeline stored
//! - Device lookups report missing devices as 404
//! - Threshold commands are validated before they are published
//! - Errors map to the documented status codes

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use drive_monitor::{
    api::{ApiConfig, ApiState, spawn_api_server},
    config::TopicConfig,
    transport::{CommandPublisher, Qos},
};
use serde_json::{Value, json};

use crate::helpers::*;

async fn spawn_test_api(hub: &TestHub, publisher: Arc<dyn CommandPublisher>) -> SocketAddr {
    let state = ApiState::new(
        hub.storage.clone(),
        hub.registry.clone(),
        publisher,
        TopicConfig::default(),
    );

    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        enable_cors: true,
    };

    spawn_api_server(config, state).await.unwrap()
}

async fn get_json(addr: SocketAddr, path: &str) -> (StatusCode, Value) {
    let response = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
    (status, response.json().await.unwrap())
}

async fn post_json(addr: SocketAddr, path: &str, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{addr}{path}"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let hub = create_test_hub().await;
    let addr = spawn_test_api(&hub, Arc::new(MockPublisher::default())).await;

    let (status, json) = get_json(addr, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_device_endpoints() {
    let hub = create_test_hub().await;
    hub.dispatcher
        .handle(STATUS, &status("d1", 5.0, 3.0, 2.0, 4.0))
        .await
        .unwrap();
    let addr = spawn_test_api(&hub, Arc::new(MockPublisher::default())).await;

    let (status, json) = get_json(addr, "/api/v1/devices").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["devices"][0]["device_id"], "d1");
    assert_eq!(json["devices"][0]["connected"], true);

    let (status, json) = get_json(addr, "/api/v1/devices/d1/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["thresholds"]["cornering"], 4.0);

    let (status, json) = get_json(addr, "/api/v1/devices/nope/status").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_alert_endpoints() {
    let hub = create_test_hub().await;
    hub.dispatcher
        .handle(ALERTS, &crash_alert("d1", 1, 8.5))
        .await
        .unwrap();
    hub.dispatcher
        .handle(ALERTS, &warning_alert("d1", "harsh_braking", 2, 0.1, -4.5))
        .await
        .unwrap();
    hub.dispatcher
        .handle(ALERTS, &warning_alert("d2", "harsh_braking", 3, 0.2, -3.0))
        .await
        .unwrap();
    let addr = spawn_test_api(&hub, Arc::new(MockPublisher::default())).await;

    let (status, json) = get_json(addr, "/api/v1/alerts?device=d1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    // Newest first
    assert_eq!(json["alerts"][0]["kind"], "warning");
    assert_eq!(json["alerts"][1]["kind"], "crash");

    let (_, json) = get_json(addr, "/api/v1/alerts?kind=warning").await;
    assert_eq!(json["count"], 2);

    let (status, _) = get_json(addr, "/api/v1/alerts?kind=rollover").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = get_json(addr, "/api/v1/alerts/summary").await;
    assert_eq!(status, StatusCode::OK);
    let summary = json["summary"].as_array().unwrap();
    let braking = summary
        .iter()
        .find(|row| row["event"] == "harsh_braking")
        .unwrap();
    assert_eq!(braking["count"], 2);

    let (status, json) = get_json(addr, "/api/v1/alerts/history?hours=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["hours"], 1);
    let total: i64 = json["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|bucket| bucket["count"].as_i64().unwrap())
        .sum();
    assert_eq!(total, 3);
}

#[tokio::test]
async fn test_reading_endpoints() {
    let hub = create_test_hub().await;
    hub.dispatcher
        .handle(TELEMETRY, &telemetry("d1", 0, 100, 4))
        .await
        .unwrap();
    hub.dispatcher
        .handle(TELEMETRY, &telemetry("d1", 40, 100, 4))
        .await
        .unwrap();
    let addr = spawn_test_api(&hub, Arc::new(MockPublisher::default())).await;

    let (status, json) = get_json(addr, "/api/v1/readings/batches?device=d1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    assert_eq!(json["batches"][0]["sample_count"], 4);
    let newest = json["batches"][0]["batch_id"].as_i64().unwrap();

    let (status, json) = get_json(addr, &format!("/api/v1/readings/batches/{newest}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["readings"][3]["calculated_timestamp"], 70);

    let (status, _) = get_json(addr, "/api/v1/readings/batches/999999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = get_json(addr, "/api/v1/readings/latest?limit=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 5);
    let stamps: Vec<i64> = json["readings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["calculated_timestamp"].as_i64().unwrap())
        .collect();
    assert_eq!(stamps, vec![30, 40, 50, 60, 70]);
}

#[tokio::test]
async fn test_stats_and_reset() {
    let hub = create_test_hub().await;
    hub.dispatcher
        .handle(ALERTS, &crash_alert("d1", 1, 4.0))
        .await
        .unwrap();
    hub.dispatcher
        .handle(ALERTS, &crash_alert("d2", 1, 4.0))
        .await
        .unwrap();
    let addr = spawn_test_api(&hub, Arc::new(MockPublisher::default())).await;

    let (status, json) = get_json(addr, "/api/v1/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["store"]["total_alerts"], 2);
    assert_eq!(json["store"]["crashes"], 2);

    let (status, json) = post_json(addr, "/api/v1/stats/reset?device=d1", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], 1);

    let (_, json) = get_json(addr, "/api/v1/stats").await;
    assert_eq!(json["store"]["total_alerts"], 1);
}

#[tokio::test]
async fn test_threshold_command_is_published() {
    let hub = create_test_hub().await;
    let publisher = Arc::new(MockPublisher::default());
    let addr = spawn_test_api(&hub, publisher.clone()).await;

    let (status, json) = post_json(
        addr,
        "/api/v1/devices/d1/threshold",
        json!({ "type": "braking", "value": 2.5 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["topic"], "driving/commands/d1");

    let sent = publisher.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "driving/commands/d1");
    assert_eq!(sent[0].2, Qos::AtLeastOnce);
    let payload: Value = serde_json::from_slice(&sent[0].1).unwrap();
    assert_eq!(
        payload,
        json!({ "cmd": "set_threshold", "type": "braking", "value": 2.5 })
    );
}

#[tokio::test]
async fn test_threshold_command_validation() {
    let hub = create_test_hub().await;
    let publisher = Arc::new(MockPublisher::default());
    let addr = spawn_test_api(&hub, publisher.clone()).await;

    for body in [
        json!({ "type": "speed", "value": 2.0 }),
        json!({ "type": "crash", "value": 51 }),
        json!({ "type": "crash", "value": "3" }),
        json!({ "value": 3.0 }),
    ] {
        let (status, json) = post_json(addr, "/api/v1/devices/d1/threshold", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }
    assert!(publisher.sent().is_empty());
}

#[tokio::test]
async fn test_threshold_command_while_offline() {
    let hub = create_test_hub().await;
    let addr = spawn_test_api(&hub, Arc::new(MockPublisher::offline())).await;

    let (status, json) = post_json(
        addr,
        "/api/v1/devices/d1/threshold",
        json!({ "type": "crash", "value": 3.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].is_string());
}
