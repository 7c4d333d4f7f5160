//! Analytics emission
//!
//! Fire-and-forget: the core reports transitions and errors here but never
//! depends on the outcome.

use tracing::{info, warn};

/// Fire-and-forget analytics sink
pub trait AnalyticsEmitter: Send + Sync {
    fn log_event(&self, name: &str, attributes: &[(&str, String)]);
    fn log_error(&self, error: &dyn std::error::Error, context: &str);
}

/// Emits analytics as structured log lines
#[derive(Default)]
pub struct TracingAnalytics;

impl AnalyticsEmitter for TracingAnalytics {
    fn log_event(&self, name: &str, attributes: &[(&str, String)]) {
        info!(event = %name, attributes = ?attributes, "analytics_event");
    }

    fn log_error(&self, error: &dyn std::error::Error, context: &str) {
        warn!(error = %error, context = %context, "analytics_error");
    }
}

/// Captures events and errors for assertions
#[cfg(test)]
#[derive(Default)]
pub struct RecordingAnalytics {
    events: parking_lot::Mutex<Vec<(String, Vec<(String, String)>)>>,
    errors: parking_lot::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl RecordingAnalytics {
    pub fn events(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.events.lock().clone()
    }

    pub fn errors(&self) -> Vec<(String, String)> {
        self.errors.lock().clone()
    }
}

#[cfg(test)]
impl AnalyticsEmitter for RecordingAnalytics {
    fn log_event(&self, name: &str, attributes: &[(&str, String)]) {
        let attrs = attributes.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        self.events.lock().push((name.to_string(), attrs));
    }

    fn log_error(&self, error: &dyn std::error::Error, context: &str) {
        self.errors.lock().push((error.to_string(), context.to_string()));
    }
}
