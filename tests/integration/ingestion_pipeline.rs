//! End-to-end ingestion through the dispatcher and the ingest actor
//!
//! These tests verify that:
//! - Telemetry rows carry derived timestamps and registry entries appear
//! - Consecutive batches get increasing batch ids
//! - Status thresholds survive later alerts
//! - Malformed messages leave no trace

use assert_matches::assert_matches;
use drive_monitor::{
    actors::{ingest::IngestHandle, messages::InboundMessage},
    devices::Thresholds,
    ingest::{IngestError, Ingested},
    storage::{AlertKind, AlertQuery, StorageBackend},
};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

use crate::helpers::*;

#[tokio::test]
async fn test_telemetry_rows_and_device_registration() {
    let hub = create_test_hub().await;

    let ingested = hub
        .dispatcher
        .handle(TELEMETRY, &telemetry("d1", 1000, 100, 3))
        .await
        .unwrap();
    let Ingested::Batch { batch_id, rows, .. } = ingested else {
        panic!("expected a batch, got {ingested:?}");
    };
    assert_eq!(rows, 3);

    let readings = hub.storage.query_readings(batch_id).await.unwrap();
    let shape: Vec<(i64, i64, f64)> = readings
        .iter()
        .map(|r| (r.sample_index, r.calculated_timestamp, r.x))
        .collect();
    assert_eq!(shape, vec![(0, 1000, 0.0), (1, 1010, 1.0), (2, 1020, 2.0)]);
    assert!(readings.iter().all(|r| r.device_id == "d1"));

    let device = hub.registry.get("d1").unwrap();
    assert_eq!(device.thresholds, default_thresholds());
}

#[tokio::test]
async fn test_second_batch_gets_larger_id() {
    let hub = create_test_hub().await;

    let mut ids = Vec::new();
    for ts in [0, 500] {
        match hub
            .dispatcher
            .handle(TELEMETRY, &telemetry("d1", ts, 50, 2))
            .await
            .unwrap()
        {
            Ingested::Batch { batch_id, .. } => ids.push(batch_id),
            other => panic!("expected a batch, got {other:?}"),
        }
    }
    assert!(ids[1] > ids[0]);

    let batches = hub.storage.query_batches(Some("d1"), 10).await.unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].batch_id, ids[1]);
}

#[tokio::test]
async fn test_status_thresholds_survive_alerts() {
    let hub = create_test_hub().await;

    hub.dispatcher
        .handle(STATUS, &status("d2", 5.0, 3.0, 2.0, 4.0))
        .await
        .unwrap();
    hub.dispatcher
        .handle(ALERTS, &crash_alert("d2", 77, 9.1))
        .await
        .unwrap();

    let device = hub.registry.get("d2").unwrap();
    assert!(device.connected);
    assert_eq!(
        device.thresholds,
        Thresholds {
            crash: Some(5.0),
            braking: Some(3.0),
            accel: Some(2.0),
            cornering: Some(4.0),
        }
    );

    let alerts = hub
        .storage
        .query_alerts(AlertQuery::new(10).device("d2"))
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::Crash);
    assert_eq!(alerts[0].magnitude, Some(9.1));
    assert_eq!(alerts[0].event, None);
}

#[tokio::test]
async fn test_malformed_alert_leaves_no_trace() {
    let hub = create_test_hub().await;

    let err = hub
        .dispatcher
        .handle(ALERTS, br#"{"type":"crash","ts":1000,"dev":"d1"}"#)
        .await
        .unwrap_err();
    assert_matches!(err, IngestError::MissingField("mag"));

    assert!(hub.registry.is_empty());
    assert_eq!(hub.storage.query_stats(None).await.unwrap().total_alerts, 0);
}

#[tokio::test]
async fn test_warning_alert_columns() {
    let hub = create_test_hub().await;

    hub.dispatcher
        .handle(ALERTS, &warning_alert("d3", "harsh_braking", 12345, 0.1, -4.5))
        .await
        .unwrap();

    let alerts = hub
        .storage
        .query_alerts(AlertQuery::new(10).kind(AlertKind::Warning))
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].event.as_deref(), Some("harsh_braking"));
    assert_eq!(alerts[0].accel_x, Some(0.1));
    assert_eq!(alerts[0].accel_y, Some(-4.5));
    assert_eq!(alerts[0].magnitude, None);
    assert_eq!(alerts[0].device_timestamp, 12345);
}

#[tokio::test]
async fn test_actor_pipeline_keeps_going_after_bad_messages() {
    let hub = create_test_hub().await;
    let (tx, rx) = mpsc::channel(32);
    let ingest = IngestHandle::spawn(hub.dispatcher.clone(), rx);

    let messages = [
        InboundMessage::new(ALERTS, crash_alert("d1", 1, 4.0)),
        InboundMessage::new(ALERTS, b"{broken".to_vec()),
        InboundMessage::new("driving/unknown", b"{}".to_vec()),
        InboundMessage::new(TELEMETRY, telemetry("d1", 0, 100, 4)),
        InboundMessage::new(STATUS, status("d1", 1.0, 1.0, 1.0, 1.0)),
    ];
    for message in messages {
        tx.send(message).await.unwrap();
    }

    let stats = ingest.shutdown().await.unwrap();
    assert_eq!(stats.received, 5);
    assert_eq!(stats.stored, 3);
    assert_eq!(stats.dropped, 2);

    let store = hub.storage.query_stats(Some("d1")).await.unwrap();
    assert_eq!(store.total_alerts, 1);
    assert_eq!(store.total_readings, 4);
    assert_eq!(store.total_batches, 1);
}

#[tokio::test]
async fn test_actor_survives_overflowing_batch_timestamps() {
    let hub = create_test_hub().await;
    let (tx, rx) = mpsc::channel(8);
    let ingest = IngestHandle::spawn(hub.dispatcher.clone(), rx);

    let overflowing = format!(
        r#"{{"ts":{},"rate":1,"n":2,"d":[[1,2,3],[4,5,6]],"dev":"d1"}}"#,
        i64::MAX - 5
    );
    tx.send(InboundMessage::new(TELEMETRY, overflowing.into_bytes()))
        .await
        .unwrap();
    tx.send(InboundMessage::new(ALERTS, crash_alert("d1", 7, 6.5)))
        .await
        .unwrap();

    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    let stats = ingest.get_stats().await.unwrap();
    assert_eq!(stats.received, 2);
    assert_eq!(stats.stored, 1);
    assert_eq!(stats.dropped, 1);

    // Still accepting after the bad batch
    tx.send(InboundMessage::new(ALERTS, crash_alert("d1", 8, 7.0)))
        .await
        .unwrap();
    let stats = ingest.shutdown().await.unwrap();
    assert_eq!(stats.stored, 2);

    let store = hub.storage.query_stats(Some("d1")).await.unwrap();
    assert_eq!(store.total_alerts, 2);
    assert_eq!(store.total_readings, 0);
}
