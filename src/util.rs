use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Wall-clock milliseconds that never go backwards within the process
///
/// Stamps `received_at` on ingested messages. If the system clock steps back,
/// the last handed-out value is repeated until the clock catches up.
#[derive(Debug, Default)]
pub struct ReceiveClock {
    last: AtomicI64,
}

impl ReceiveClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_millis(&self) -> i64 {
        let wall = Utc::now().timestamp_millis();
        let previous = self.last.fetch_max(wall, Ordering::SeqCst);
        previous.max(wall)
    }
}

/// Random hex suffix for broker client ids
pub fn client_id_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..6].to_string()
}
