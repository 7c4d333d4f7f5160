//! Geofence state machine
//!
//! Owns one monitored zone at a time and derives a stable
//! {inside, outside, unknown} state from raw samples, native region events,
//! and state-determination callbacks. Every detection path goes through the
//! same `last_reported` gate: repeated identical classifications are
//! suppressed, so downstream visit transitions fire once per actual change.
//!
//! Events arrive on one serialized stream; when the region path and the
//! distance path both observe the same underlying change, whichever event
//! is consumed first wins and the later duplicate is a no-op.

use crate::domain::error::GeofenceError;
use crate::domain::geo;
use crate::domain::types::{
    GeofenceState, LocationEvent, LocationSample, StateTransition, TransitionSource, Zone, ZoneId,
};
use crate::io::location::LocationProvider;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct GeofenceTracker {
    provider: Arc<dyn LocationProvider>,
    /// Zone currently registered with the provider
    monitored: Option<Zone>,
    /// Requested zone waiting for authorization to escalate
    pending: Option<Zone>,
    last_reported: GeofenceState,
}

impl GeofenceTracker {
    pub fn new(provider: Arc<dyn LocationProvider>) -> Self {
        Self {
            provider,
            monitored: None,
            pending: None,
            last_reported: GeofenceState::Unknown,
        }
    }

    /// Register `zone` as the single monitored zone, replacing any previous
    /// registration and resetting the reported state to `Unknown`.
    ///
    /// `MonitoringUnavailable` and `InsufficientPermissions` are terminal
    /// for this attempt; with insufficient permissions the zone stays
    /// pending and monitoring restarts automatically when authorization
    /// escalates to the required level.
    pub async fn start_monitoring(&mut self, zone: Zone) -> Result<(), GeofenceError> {
        // One zone at a time: clear any previous registration first
        if self.monitored.take().is_some() {
            self.provider.stop_monitoring().await;
        }
        self.last_reported = GeofenceState::Unknown;

        match self.provider.start_monitoring(&zone).await {
            Ok(()) => {
                info!(
                    zone = %zone.id,
                    name = %zone.name,
                    radius_m = %zone.radius_m,
                    "monitoring_started"
                );
                self.pending = None;
                // Resolve the initial state without waiting for a callback
                self.provider.request_state(&zone).await;
                self.monitored = Some(zone);
                Ok(())
            }
            Err(GeofenceError::InsufficientPermissions) => {
                warn!(zone = %zone.id, "monitoring_blocked_on_permissions");
                self.pending = Some(zone);
                // Prompt for escalation; a grant comes back as an
                // AuthorizationChanged event and restarts the pending zone
                self.provider.request_authorization().await;
                Err(GeofenceError::InsufficientPermissions)
            }
            Err(e) => {
                warn!(zone = %zone.id, error = %e, "monitoring_start_failed");
                Err(e)
            }
        }
    }

    /// Unregister the zone and discard tracker state. Idempotent.
    pub async fn stop_monitoring(&mut self) {
        if self.monitored.is_some() || self.pending.is_some() {
            self.provider.stop_monitoring().await;
            info!("monitoring_stopped");
        }
        self.monitored = None;
        self.pending = None;
        self.last_reported = GeofenceState::Unknown;
    }

    /// Re-ask the provider for the zone's state without waiting for a
    /// natural update. Safe to call repeatedly; the answer arrives as a
    /// `StateDetermined` event.
    pub async fn check_current_location(&self) -> Result<(), GeofenceError> {
        let zone = self.monitored.as_ref().ok_or(GeofenceError::NotMonitoring)?;
        self.provider.request_state(zone).await;
        Ok(())
    }

    /// Recovery entry point for missed callbacks or a lingering `Unknown`
    pub async fn force_check_current_state(&self) -> Result<(), GeofenceError> {
        debug!("forcing_state_check");
        self.check_current_location().await
    }

    pub fn monitored_zone(&self) -> Option<&Zone> {
        self.monitored.as_ref()
    }

    pub fn last_reported(&self) -> GeofenceState {
        self.last_reported
    }

    /// Feed one provider event through the state machine.
    ///
    /// Returns a transition when the derived state differs from the last
    /// reported one; identical states are suppressed.
    pub async fn handle_event(&mut self, event: &LocationEvent) -> Option<StateTransition> {
        match event {
            LocationEvent::Sample(sample) => self.classify_sample(sample),
            LocationEvent::RegionEnter(zone_id) => {
                self.report_for_zone(zone_id, GeofenceState::Inside, TransitionSource::RegionEvent)
            }
            LocationEvent::RegionExit(zone_id) => {
                self.report_for_zone(zone_id, GeofenceState::Outside, TransitionSource::RegionEvent)
            }
            LocationEvent::StateDetermined(zone_id, state) => {
                // An Unknown determination carries no information; keep the
                // last reported state and wait for a better callback.
                if *state == GeofenceState::Unknown {
                    debug!(zone = %zone_id, "state_undetermined");
                    return None;
                }
                self.report_for_zone(zone_id, *state, TransitionSource::StateQuery)
            }
            LocationEvent::AuthorizationChanged(status) => {
                info!(status = %status.as_str(), "authorization_changed");
                if status.allows_monitoring() {
                    if let Some(zone) = self.pending.take() {
                        info!(zone = %zone.id, "restarting_monitoring_after_authorization");
                        if let Err(e) = self.start_monitoring(zone).await {
                            warn!(error = %e, "monitoring_restart_failed");
                        }
                    }
                }
                None
            }
            LocationEvent::MonitoringFailed(reason) => {
                // Reported per-occurrence; monitoring itself keeps going and
                // the caller may re-invoke start_monitoring.
                warn!(reason = %reason, "region_monitoring_failed");
                None
            }
        }
    }

    /// Classify a raw sample by great-circle distance to the zone center
    fn classify_sample(&mut self, sample: &LocationSample) -> Option<StateTransition> {
        let (zone_id, state) = {
            let zone = self.monitored.as_ref()?;
            let distance =
                geo::distance_m(sample.latitude, sample.longitude, zone.latitude, zone.longitude);
            let state = if distance <= zone.radius_m {
                GeofenceState::Inside
            } else {
                GeofenceState::Outside
            };
            debug!(
                zone = %zone.id,
                distance_m = format!("{distance:.1}"),
                radius_m = %zone.radius_m,
                state = %state.as_str(),
                "sample_classified"
            );
            (zone.id.clone(), state)
        };
        self.report(zone_id, state, TransitionSource::DistanceClassification)
    }

    /// Region callbacks can outlive a zone swap; drop those addressed to a
    /// zone other than the monitored one.
    fn report_for_zone(
        &mut self,
        zone_id: &ZoneId,
        state: GeofenceState,
        source: TransitionSource,
    ) -> Option<StateTransition> {
        let monitored_id = {
            let zone = self.monitored.as_ref()?;
            if zone.id != *zone_id {
                debug!(zone = %zone_id, monitored = %zone.id, "event_for_unmonitored_zone");
                return None;
            }
            zone.id.clone()
        };
        self.report(monitored_id, state, source)
    }

    /// The de-duplication gate shared by every detection path
    fn report(
        &mut self,
        zone_id: ZoneId,
        state: GeofenceState,
        source: TransitionSource,
    ) -> Option<StateTransition> {
        if state == self.last_reported {
            return None;
        }

        let from = self.last_reported;
        self.last_reported = state;
        info!(
            zone = %zone_id,
            from = %from.as_str(),
            to = %state.as_str(),
            source = %source.as_str(),
            "geofence_transition"
        );
        Some(StateTransition { zone_id, from, to: state, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::AuthorizationStatus;
    use crate::io::location::SimulatedProvider;
    use tokio::sync::mpsc;

    const BRANCH_LAT: f64 = -35.6330328;
    const BRANCH_LON: f64 = -59.7783535;

    fn zone() -> Zone {
        Zone {
            id: ZoneId::from("galeria-branch"),
            name: "Sucursal Saladillo".to_string(),
            latitude: BRANCH_LAT,
            longitude: BRANCH_LON,
            radius_m: 10.0,
        }
    }

    fn sample_at_meters(meters: f64) -> LocationSample {
        LocationSample {
            latitude: BRANCH_LAT + geo::meters_to_lat_degrees(meters),
            longitude: BRANCH_LON,
            accuracy_m: Some(5.0),
        }
    }

    struct TestGeofence {
        tracker: GeofenceTracker,
        provider: Arc<SimulatedProvider>,
        #[allow(dead_code)]
        events_rx: mpsc::Receiver<LocationEvent>,
    }

    fn create_tracker() -> TestGeofence {
        let (tx, events_rx) = mpsc::channel(64);
        let provider = Arc::new(SimulatedProvider::new(tx));
        let tracker = GeofenceTracker::new(provider.clone());
        TestGeofence { tracker, provider, events_rx }
    }

    #[tokio::test]
    async fn test_sample_inside_then_duplicate_suppressed() {
        let mut t = create_tracker();
        t.tracker.start_monitoring(zone()).await.unwrap();

        let first = t
            .tracker
            .handle_event(&LocationEvent::Sample(sample_at_meters(5.0)))
            .await
            .expect("first inside sample emits");
        assert_eq!(first.from, GeofenceState::Unknown);
        assert_eq!(first.to, GeofenceState::Inside);
        assert_eq!(first.source, TransitionSource::DistanceClassification);

        // Same classification again: no second transition
        let second = t.tracker.handle_event(&LocationEvent::Sample(sample_at_meters(5.0))).await;
        assert!(second.is_none());
        assert_eq!(t.tracker.last_reported(), GeofenceState::Inside);
    }

    #[tokio::test]
    async fn test_boundary_sample_is_inside() {
        let mut t = create_tracker();
        t.tracker.start_monitoring(zone()).await.unwrap();

        // distance == radius classifies as inside
        let transition =
            t.tracker.handle_event(&LocationEvent::Sample(sample_at_meters(10.0))).await;
        assert_eq!(transition.map(|t| t.to), Some(GeofenceState::Inside));
    }

    #[tokio::test]
    async fn test_region_event_agreeing_with_sample_is_noop() {
        let mut t = create_tracker();
        t.tracker.start_monitoring(zone()).await.unwrap();

        t.tracker.handle_event(&LocationEvent::Sample(sample_at_meters(5.0))).await.unwrap();

        // The native enter callback for the same underlying change
        let dup = t
            .tracker
            .handle_event(&LocationEvent::RegionEnter(ZoneId::from("galeria-branch")))
            .await;
        assert!(dup.is_none());

        // A disagreeing exit callback does emit
        let exit = t
            .tracker
            .handle_event(&LocationEvent::RegionExit(ZoneId::from("galeria-branch")))
            .await
            .unwrap();
        assert_eq!(exit.from, GeofenceState::Inside);
        assert_eq!(exit.to, GeofenceState::Outside);
        assert_eq!(exit.source, TransitionSource::RegionEvent);
    }

    #[tokio::test]
    async fn test_events_for_other_zones_ignored() {
        let mut t = create_tracker();
        t.tracker.start_monitoring(zone()).await.unwrap();

        let transition =
            t.tracker.handle_event(&LocationEvent::RegionEnter(ZoneId::from("other-branch"))).await;
        assert!(transition.is_none());
        assert_eq!(t.tracker.last_reported(), GeofenceState::Unknown);
    }

    #[tokio::test]
    async fn test_unknown_state_determination_ignored() {
        let mut t = create_tracker();
        t.tracker.start_monitoring(zone()).await.unwrap();
        t.tracker.handle_event(&LocationEvent::Sample(sample_at_meters(5.0))).await.unwrap();

        let transition = t
            .tracker
            .handle_event(&LocationEvent::StateDetermined(
                ZoneId::from("galeria-branch"),
                GeofenceState::Unknown,
            ))
            .await;
        assert!(transition.is_none());
        assert_eq!(t.tracker.last_reported(), GeofenceState::Inside);
    }

    #[tokio::test]
    async fn test_start_resets_state_and_replaces_zone() {
        let mut t = create_tracker();
        t.tracker.start_monitoring(zone()).await.unwrap();
        t.tracker.handle_event(&LocationEvent::Sample(sample_at_meters(5.0))).await.unwrap();
        assert_eq!(t.tracker.last_reported(), GeofenceState::Inside);

        let other = Zone { id: ZoneId::from("test-branch"), ..zone() };
        t.tracker.start_monitoring(other).await.unwrap();

        assert_eq!(t.tracker.last_reported(), GeofenceState::Unknown);
        assert_eq!(t.tracker.monitored_zone().map(|z| z.id.clone()), Some(ZoneId::from("test-branch")));
    }

    #[tokio::test]
    async fn test_stop_monitoring_idempotent() {
        let mut t = create_tracker();
        t.tracker.start_monitoring(zone()).await.unwrap();

        t.tracker.stop_monitoring().await;
        t.tracker.stop_monitoring().await;

        assert!(t.tracker.monitored_zone().is_none());
        assert_eq!(t.tracker.last_reported(), GeofenceState::Unknown);
        assert_eq!(
            t.tracker.check_current_location().await,
            Err(GeofenceError::NotMonitoring)
        );
    }

    #[tokio::test]
    async fn test_monitoring_unavailable_is_surfaced() {
        let (tx, _rx) = mpsc::channel(8);
        let provider = Arc::new(SimulatedProvider::without_region_support(tx));
        let mut tracker = GeofenceTracker::new(provider);

        let result = tracker.start_monitoring(zone()).await;
        assert_eq!(result, Err(GeofenceError::MonitoringUnavailable));
        assert!(tracker.monitored_zone().is_none());
    }

    #[tokio::test]
    async fn test_pending_zone_restarts_on_authorization() {
        let (tx, _rx) = mpsc::channel(64);
        let provider =
            Arc::new(SimulatedProvider::with_authorization(tx, AuthorizationStatus::WhenInUse));
        let mut tracker = GeofenceTracker::new(provider.clone());

        let result = tracker.start_monitoring(zone()).await;
        assert_eq!(result, Err(GeofenceError::InsufficientPermissions));
        assert!(tracker.monitored_zone().is_none());

        // Authorization escalates; the pending zone is registered
        provider.set_authorization(AuthorizationStatus::Always).await;
        tracker
            .handle_event(&LocationEvent::AuthorizationChanged(AuthorizationStatus::Always))
            .await;

        assert_eq!(
            tracker.monitored_zone().map(|z| z.id.clone()),
            Some(ZoneId::from("galeria-branch"))
        );
    }

    #[tokio::test]
    async fn test_monitoring_failure_does_not_stop_tracking() {
        let mut t = create_tracker();
        t.tracker.start_monitoring(zone()).await.unwrap();
        t.tracker.handle_event(&LocationEvent::Sample(sample_at_meters(5.0))).await.unwrap();

        let transition = t
            .tracker
            .handle_event(&LocationEvent::MonitoringFailed("radio fault".to_string()))
            .await;
        assert!(transition.is_none());

        // Tracking continues: a later exit still emits
        let exit = t.tracker.handle_event(&LocationEvent::Sample(sample_at_meters(25.0))).await;
        assert_eq!(exit.map(|t| t.to), Some(GeofenceState::Outside));
    }

    #[tokio::test]
    async fn test_emission_count_never_exceeds_state_changes() {
        let mut t = create_tracker();
        t.tracker.start_monitoring(zone()).await.unwrap();

        // in, in, out, out, in: three actual changes
        let distances = [5.0, 7.0, 30.0, 40.0, 3.0];
        let mut emitted = 0;
        for d in distances {
            if t.tracker.handle_event(&LocationEvent::Sample(sample_at_meters(d))).await.is_some()
            {
                emitted += 1;
            }
        }
        assert_eq!(emitted, 3);
    }
}
