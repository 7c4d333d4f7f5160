//! Transition and event handlers for the Tracker
//!
//! Entry edges open visits; exit edges close them. Distance- and
//! query-derived Outside states are handled asymmetrically from native
//! region exits: resolving Unknown -> Outside is not an exit.

use super::Tracker;
use crate::domain::error::{GeofenceError, VisitError};
use crate::domain::types::{GeofenceState, LocationEvent, StateTransition, TransitionSource};
use tracing::{debug, info, warn};

impl Tracker {
    pub(crate) async fn handle_transition(&mut self, transition: StateTransition) {
        match transition.to {
            GeofenceState::Inside => self.handle_entered(&transition).await,
            GeofenceState::Outside => self.handle_exited(&transition).await,
            // The dedup gate never reports a transition back to Unknown
            GeofenceState::Unknown => {}
        }
    }

    /// Entry edge: open a visit. The lifecycle manager tolerates duplicate
    /// entries by returning the visit already open, so late-retried
    /// provider callbacks are safe here.
    async fn handle_entered(&mut self, transition: &StateTransition) {
        self.analytics.log_event(
            "geofence_entered",
            &[
                ("zone_id", transition.zone_id.to_string()),
                ("source", transition.source.as_str().to_string()),
            ],
        );

        let Some(zone) = self.geofence.monitored_zone().cloned() else {
            return;
        };

        match self.visits.start_visit(&zone).await {
            Ok(visit) => {
                self.metrics.record_visit_opened();
                debug!(id = %visit.id, zone = %zone.id, "entry_processed");
            }
            Err(e) => {
                self.metrics.record_store_failure();
                self.analytics.log_error(&e, "start_visit");
                warn!(zone = %zone.id, error = %e, "visit_open_failed");
            }
        }
    }

    /// Exit edge. A native region exit always attempts to close and
    /// surfaces `NotFound` as a desync signal; a distance- or query-derived
    /// Outside only closes when a visit is actually open, since
    /// Unknown -> Outside merely resolves the initial state.
    async fn handle_exited(&mut self, transition: &StateTransition) {
        self.analytics.log_event(
            "geofence_exited",
            &[
                ("zone_id", transition.zone_id.to_string()),
                ("source", transition.source.as_str().to_string()),
            ],
        );

        if transition.source != TransitionSource::RegionEvent
            && !self.visits.has_open_visit().await
        {
            debug!(zone = %transition.zone_id, "state_resolved_outside");
            return;
        }

        match self.visits.end_visit().await {
            Ok(visit) => {
                self.metrics.record_visit_closed();
                let duration_secs =
                    visit.duration().map(|d| d.num_seconds()).unwrap_or_default();
                info!(id = %visit.id, duration_secs, "exit_processed");
            }
            Err(VisitError::NotFound) => {
                self.metrics.record_desync();
                self.analytics.log_error(&VisitError::NotFound, "end_visit");
                warn!(zone = %transition.zone_id, "exit_without_open_visit");
            }
            Err(e) => {
                self.metrics.record_store_failure();
                self.analytics.log_error(&e, "end_visit");
                warn!(zone = %transition.zone_id, error = %e, "visit_close_failed");
            }
        }
    }

    /// Analytics for events that are meaningful even without a transition
    pub(crate) fn record_event_analytics(&self, event: &LocationEvent) {
        match event {
            LocationEvent::AuthorizationChanged(status) => {
                self.analytics.log_event(
                    "location_permission_changed",
                    &[("status", status.as_str().to_string())],
                );
            }
            LocationEvent::StateDetermined(zone_id, state) => {
                self.analytics.log_event(
                    "geofence_state_determined",
                    &[
                        ("zone_id", zone_id.to_string()),
                        ("state", state.as_str().to_string()),
                    ],
                );
            }
            LocationEvent::MonitoringFailed(reason) => {
                self.metrics.record_monitoring_failure();
                self.analytics.log_error(
                    &GeofenceError::RegionMonitoringFailed(reason.clone()),
                    "region_monitoring",
                );
            }
            _ => {}
        }
    }
}
