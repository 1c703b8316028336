//! Integration tests for storage persistence across restarts

use drive_monitor::{
    ingest::Ingested,
    storage::{AlertQuery, StorageBackend, sqlite::SqliteBackend},
};

use crate::helpers::*;

#[tokio::test]
async fn test_data_and_batch_ids_survive_restart() {
    let hub = create_test_hub().await;
    let db_path = hub.dir.path().join("hub.db");

    hub.dispatcher
        .handle(ALERTS, &crash_alert("d1", 10, 5.5))
        .await
        .unwrap();

    let mut last_batch = 0;
    for ts in [0, 100, 200] {
        if let Ingested::Batch { batch_id, .. } = hub
            .dispatcher
            .handle(TELEMETRY, &telemetry("d1", ts, 10, 5))
            .await
            .unwrap()
        {
            last_batch = batch_id;
        }
    }
    hub.storage.close().await.unwrap();

    let reopened = SqliteBackend::new(&db_path).await.unwrap();
    assert!(reopened.next_batch_id() > last_batch);

    let alerts = reopened.query_alerts(AlertQuery::new(10)).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].device_id, "d1");

    let stats = reopened.query_stats(None).await.unwrap();
    assert_eq!(stats.total_readings, 15);
    assert_eq!(stats.total_batches, 3);
}

#[tokio::test]
async fn test_reset_keeps_readings() {
    let hub = create_test_hub().await;

    hub.dispatcher
        .handle(ALERTS, &crash_alert("d1", 1, 4.0))
        .await
        .unwrap();
    hub.dispatcher
        .handle(ALERTS, &crash_alert("d2", 2, 4.0))
        .await
        .unwrap();
    hub.dispatcher
        .handle(TELEMETRY, &telemetry("d1", 0, 10, 3))
        .await
        .unwrap();

    assert_eq!(hub.storage.delete_alerts(Some("d1")).await.unwrap(), 1);

    let stats = hub.storage.query_stats(None).await.unwrap();
    assert_eq!(stats.total_alerts, 1);
    assert_eq!(stats.total_readings, 3);
}
