//! Geofence event orchestration
//!
//! The Tracker is the single consumer of the location event stream. It
//! coordinates:
//! - Geofence state derivation (via `GeofenceTracker`)
//! - Visit lifecycle (opening on entry edges, closing on exit edges)
//! - Analytics emission for transitions, permission changes, and failures

mod handlers;
#[cfg(test)]
mod tests;

use crate::domain::error::GeofenceError;
use crate::domain::types::{LocationEvent, Zone};
use crate::infra::metrics::Metrics;
use crate::io::analytics::AnalyticsEmitter;
use crate::services::geofence::GeofenceTracker;
use crate::services::visit_manager::VisitManager;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;

/// Central event processor for geofence state and visit lifecycle
pub struct Tracker {
    /// Derives de-duplicated geofence state from raw events
    pub(crate) geofence: GeofenceTracker,
    /// Owns the at-most-one-open-visit invariant
    pub(crate) visits: Arc<VisitManager>,
    /// Fire-and-forget analytics sink
    pub(crate) analytics: Arc<dyn AnalyticsEmitter>,
    /// Pipeline counters
    pub(crate) metrics: Arc<Metrics>,
}

impl Tracker {
    pub fn new(
        geofence: GeofenceTracker,
        visits: Arc<VisitManager>,
        analytics: Arc<dyn AnalyticsEmitter>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { geofence, visits, analytics, metrics }
    }

    /// Begin monitoring `zone`, surfacing capability and permission errors
    pub async fn start_monitoring(&mut self, zone: Zone) -> Result<(), GeofenceError> {
        let result = self.geofence.start_monitoring(zone).await;
        if let Err(e) = &result {
            self.analytics.log_error(e, "start_monitoring");
        }
        result
    }

    /// Stop monitoring and discard geofence state; idempotent
    pub async fn stop_monitoring(&mut self) {
        self.geofence.stop_monitoring().await;
    }

    /// Re-query the provider to resolve a lingering Unknown state
    pub async fn force_check_current_state(&self) -> Result<(), GeofenceError> {
        self.geofence.force_check_current_state().await
    }

    /// Consume events until the channel closes or shutdown fires
    pub async fn run(
        &mut self,
        mut events: mpsc::Receiver<LocationEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => self.process_event(event).await,
                        None => break, // Channel closed
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("tracker_shutdown");
                        break;
                    }
                }
            }
        }
    }

    /// Feed one event through the geofence state machine and act on the
    /// resulting transition, if any
    pub async fn process_event(&mut self, event: LocationEvent) {
        self.metrics.record_event();
        self.record_event_analytics(&event);

        if let Some(transition) = self.geofence.handle_event(&event).await {
            self.metrics.record_transition();
            self.handle_transition(transition).await;
        }
    }

    /// Whether a visit is currently open
    pub async fn has_open_visit(&self) -> bool {
        self.visits.has_open_visit().await
    }
}
