//! Local notification emission
//!
//! Notifications are fire-and-forget side effects: the core schedules them
//! after a state transition has been persisted and never inspects the
//! outcome. A failed delivery is logged by the implementation and must not
//! block or fail the transition that triggered it.

use crate::domain::types::Zone;
use std::collections::HashMap;
use tracing::info;

/// Content for a local alert shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct LocalAlert {
    pub title: String,
    pub body: String,
    pub metadata: HashMap<String, String>,
}

impl LocalAlert {
    pub fn entry(zone: &Zone) -> Self {
        Self {
            title: "Welcome to the branch".to_string(),
            body: format!("You have arrived at {}. How can we help you?", zone.name),
            metadata: HashMap::from([
                ("zone_id".to_string(), zone.id.to_string()),
                ("type".to_string(), "entry".to_string()),
            ]),
        }
    }

    pub fn exit(zone_id: &str, zone_name: &str, duration: &str) -> Self {
        Self {
            title: "Thank you for visiting".to_string(),
            body: format!("You spent {duration} at {zone_name}"),
            metadata: HashMap::from([
                ("zone_id".to_string(), zone_id.to_string()),
                ("type".to_string(), "exit".to_string()),
            ]),
        }
    }
}

/// Fire-and-forget notification sink
pub trait NotificationEmitter: Send + Sync {
    fn schedule_local_alert(&self, alert: LocalAlert);
}

/// Logs alerts instead of delivering them
#[derive(Default)]
pub struct TracingNotifier;

impl NotificationEmitter for TracingNotifier {
    fn schedule_local_alert(&self, alert: LocalAlert) {
        info!(title = %alert.title, body = %alert.body, "local_alert_scheduled");
    }
}

/// Discards alerts; used when notifications are disabled in config
#[derive(Default)]
pub struct NoopNotifier;

impl NotificationEmitter for NoopNotifier {
    fn schedule_local_alert(&self, _alert: LocalAlert) {}
}

/// Captures alerts for assertions
#[cfg(test)]
#[derive(Default)]
pub struct RecordingNotifier {
    alerts: parking_lot::Mutex<Vec<LocalAlert>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<LocalAlert> {
        self.alerts.lock().clone()
    }
}

#[cfg(test)]
impl NotificationEmitter for RecordingNotifier {
    fn schedule_local_alert(&self, alert: LocalAlert) {
        self.alerts.lock().push(alert);
    }
}
