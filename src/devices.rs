//! In-memory registry of live device state
//!
//! The registry is owned by the hub and shared by handle: the ingestion
//! dispatcher creates and updates entries, the query interface reads them.
//! Nothing here is persisted; a restart starts from an empty registry.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Category of a per-device sensitivity threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdKind {
    Crash,
    Braking,
    Accel,
    Cornering,
}

impl ThresholdKind {
    pub const ALL: [ThresholdKind; 4] = [
        ThresholdKind::Crash,
        ThresholdKind::Braking,
        ThresholdKind::Accel,
        ThresholdKind::Cornering,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdKind::Crash => "crash",
            ThresholdKind::Braking => "braking",
            ThresholdKind::Accel => "accel",
            ThresholdKind::Cornering => "cornering",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl std::fmt::Display for ThresholdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold values reported by a device
///
/// A status message replaces all four values at once; a value the device did
/// not report is stored as `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub crash: Option<f64>,
    pub braking: Option<f64>,
    pub accel: Option<f64>,
    pub cornering: Option<f64>,
}

impl Thresholds {
    pub fn get(&self, kind: ThresholdKind) -> Option<f64> {
        match kind {
            ThresholdKind::Crash => self.crash,
            ThresholdKind::Braking => self.braking,
            ThresholdKind::Accel => self.accel,
            ThresholdKind::Cornering => self.cornering,
        }
    }
}

/// Last known operational state of one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub device_id: String,
    pub connected: bool,
    pub thresholds: Thresholds,
    pub last_update: DateTime<Utc>,
}

/// Shared handle to the device map
///
/// Cloning the registry clones the handle, not the map.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    devices: Arc<RwLock<HashMap<String, DeviceState>>>,
    defaults: Thresholds,
}

impl DeviceRegistry {
    /// Create an empty registry; new devices start with `defaults`
    pub fn new(defaults: Thresholds) -> Self {
        Self {
            devices: Arc::new(RwLock::new(HashMap::new())),
            defaults,
        }
    }

    /// Return the device, creating it with default thresholds if unseen
    ///
    /// An existing entry is returned untouched.
    pub fn get_or_create(&self, device_id: &str) -> DeviceState {
        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        devices
            .entry(device_id.to_string())
            .or_insert_with(|| {
                debug!("registering device {device_id}");
                DeviceState {
                    device_id: device_id.to_string(),
                    connected: true,
                    thresholds: self.defaults,
                    last_update: Utc::now(),
                }
            })
            .clone()
    }

    pub fn get(&self, device_id: &str) -> Option<DeviceState> {
        let devices = self.devices.read().unwrap_or_else(PoisonError::into_inner);
        devices.get(device_id).cloned()
    }

    /// All known devices ordered by id
    pub fn list(&self) -> Vec<DeviceState> {
        let devices = self.devices.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<DeviceState> = devices.values().cloned().collect();
        list.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        list
    }

    /// Apply a status report: mark connected, replace thresholds, refresh timestamp
    pub fn update_status(&self, device_id: &str, thresholds: Thresholds) -> DeviceState {
        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        let state = devices
            .entry(device_id.to_string())
            .or_insert_with(|| DeviceState {
                device_id: device_id.to_string(),
                connected: true,
                thresholds: self.defaults,
                last_update: Utc::now(),
            });

        state.connected = true;
        state.thresholds = thresholds;
        state.last_update = Utc::now();
        state.clone()
    }

    pub fn len(&self) -> usize {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
