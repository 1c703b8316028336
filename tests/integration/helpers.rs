//! Helper functions for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use drive_monitor::{
    config::TopicConfig,
    devices::{DeviceRegistry, Thresholds},
    ingest::Dispatcher,
    storage::sqlite::SqliteBackend,
    transport::{CommandPublisher, Qos, TransportError},
};
use tempfile::TempDir;

pub const ALERTS: &str = "driving/alerts";
pub const TELEMETRY: &str = "driving/telemetry";
pub const STATUS: &str = "driving/status";

pub fn default_thresholds() -> Thresholds {
    Thresholds {
        crash: Some(3.0),
        braking: Some(2.0),
        accel: Some(1.5),
        cornering: Some(2.0),
    }
}

/// Dispatcher over a fresh database in its own temp dir
pub struct TestHub {
    pub dir: TempDir,
    pub storage: Arc<SqliteBackend>,
    pub registry: DeviceRegistry,
    pub dispatcher: Dispatcher,
}

pub async fn create_test_hub() -> TestHub {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(SqliteBackend::new(dir.path().join("hub.db")).await.unwrap());
    let registry = DeviceRegistry::new(default_thresholds());
    let dispatcher = Dispatcher::new(storage.clone(), registry.clone(), TopicConfig::default());

    TestHub {
        dir,
        storage,
        registry,
        dispatcher,
    }
}

pub fn crash_alert(dev: &str, ts: i64, mag: f64) -> Vec<u8> {
    serde_json::json!({ "type": "crash", "ts": ts, "mag": mag, "dev": dev })
        .to_string()
        .into_bytes()
}

pub fn warning_alert(dev: &str, event: &str, ts: i64, x: f64, y: f64) -> Vec<u8> {
    serde_json::json!({ "type": "warning", "event": event, "ts": ts, "x": x, "y": y, "dev": dev })
        .to_string()
        .into_bytes()
}

/// Telemetry batch with `count` samples whose x component is the sample index
pub fn telemetry(dev: &str, ts: i64, rate: u32, count: usize) -> Vec<u8> {
    let samples: Vec<[f64; 3]> = (0..count).map(|i| [i as f64, 0.5, 9.81]).collect();
    serde_json::json!({ "ts": ts, "rate": rate, "n": count, "d": samples, "dev": dev })
        .to_string()
        .into_bytes()
}

pub fn status(dev: &str, crash: f64, braking: f64, accel: f64, cornering: f64) -> Vec<u8> {
    serde_json::json!({
        "dev": dev,
        "crash": crash,
        "braking": braking,
        "accel": accel,
        "cornering": cornering,
    })
    .to_string()
    .into_bytes()
}

/// Publisher that records every command instead of talking to a broker
#[derive(Default)]
pub struct MockPublisher {
    pub sent: Mutex<Vec<(String, Vec<u8>, Qos)>>,
    pub offline: bool,
}

impl MockPublisher {
    pub fn offline() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            offline: true,
        }
    }

    pub fn sent(&self) -> Vec<(String, Vec<u8>, Qos)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandPublisher for MockPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: Qos) -> Result<(), TransportError> {
        if self.offline {
            return Err(TransportError::NotConnected);
        }
        self.sent
            .lock()
            .unwrap()
            .push((topic.to_string(), payload, qos));
        Ok(())
    }
}
