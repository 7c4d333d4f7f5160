//! Location provider interface and a scripted simulator
//!
//! The provider delivers every callback (samples, region edges, state
//! determinations, authorization changes, runtime failures) as a
//! `LocationEvent` on a single channel, so the tracker consumes one
//! serialized stream instead of independent callback methods.

use crate::domain::error::GeofenceError;
use crate::domain::types::{
    AuthorizationStatus, GeofenceState, LocationEvent, LocationSample, Zone, ZoneId,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// Raw position and region-event source.
///
/// No ordering or delivery guarantees: callbacks may be duplicated, late, or
/// missing entirely. Answers to `request_state` arrive as `StateDetermined`
/// events, not return values.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Register `zone` for region callbacks, replacing any prior
    /// registration. Fails with `MonitoringUnavailable` when the platform
    /// cannot monitor regions and `InsufficientPermissions` when
    /// authorization is below the required level.
    async fn start_monitoring(&self, zone: &Zone) -> Result<(), GeofenceError>;

    /// Unregister everything; idempotent
    async fn stop_monitoring(&self);

    /// Ask for an out-of-band state determination for `zone`
    async fn request_state(&self, zone: &Zone);

    /// Prompt for the authorization level monitoring needs. The outcome
    /// arrives later as an `AuthorizationChanged` event.
    async fn request_authorization(&self);

    fn authorization_status(&self) -> AuthorizationStatus;
}

/// Scripted provider for the demo binary and integration tests.
///
/// Events are pushed on demand; `request_state` re-delivers the most
/// recently scripted region state, mimicking a platform that answers state
/// queries from its region cache.
pub struct SimulatedProvider {
    events: mpsc::Sender<LocationEvent>,
    authorization: Mutex<AuthorizationStatus>,
    monitored: Mutex<Option<ZoneId>>,
    last_state: Mutex<GeofenceState>,
    monitoring_available: bool,
}

impl SimulatedProvider {
    pub fn new(events: mpsc::Sender<LocationEvent>) -> Self {
        Self {
            events,
            authorization: Mutex::new(AuthorizationStatus::Always),
            monitored: Mutex::new(None),
            last_state: Mutex::new(GeofenceState::Unknown),
            monitoring_available: true,
        }
    }

    /// A platform without region monitoring support
    pub fn without_region_support(events: mpsc::Sender<LocationEvent>) -> Self {
        Self { monitoring_available: false, ..Self::new(events) }
    }

    /// A platform that has not granted background location authorization
    pub fn with_authorization(
        events: mpsc::Sender<LocationEvent>,
        status: AuthorizationStatus,
    ) -> Self {
        let provider = Self::new(events);
        *provider.authorization.lock() = status;
        provider
    }

    /// Change the authorization level and deliver the callback
    pub async fn set_authorization(&self, status: AuthorizationStatus) {
        *self.authorization.lock() = status;
        let _ = self.events.send(LocationEvent::AuthorizationChanged(status)).await;
    }

    /// Deliver a raw position sample
    pub async fn push_sample(&self, sample: LocationSample) {
        let _ = self.events.send(LocationEvent::Sample(sample)).await;
    }

    /// Deliver a native region-enter callback for the monitored zone
    pub async fn push_region_enter(&self) {
        let zone = self.monitored.lock().clone();
        if let Some(zone) = zone {
            *self.last_state.lock() = GeofenceState::Inside;
            let _ = self.events.send(LocationEvent::RegionEnter(zone)).await;
        }
    }

    /// Deliver a native region-exit callback for the monitored zone
    pub async fn push_region_exit(&self) {
        let zone = self.monitored.lock().clone();
        if let Some(zone) = zone {
            *self.last_state.lock() = GeofenceState::Outside;
            let _ = self.events.send(LocationEvent::RegionExit(zone)).await;
        }
    }

    /// Deliver a runtime monitoring failure
    pub async fn fail_monitoring(&self, reason: &str) {
        let _ = self.events.send(LocationEvent::MonitoringFailed(reason.to_string())).await;
    }

    /// Script the state that future `request_state` calls will report
    pub fn set_region_state(&self, state: GeofenceState) {
        *self.last_state.lock() = state;
    }
}

#[async_trait]
impl LocationProvider for SimulatedProvider {
    async fn start_monitoring(&self, zone: &Zone) -> Result<(), GeofenceError> {
        if !self.monitoring_available {
            return Err(GeofenceError::MonitoringUnavailable);
        }
        if !self.authorization.lock().allows_monitoring() {
            return Err(GeofenceError::InsufficientPermissions);
        }

        *self.monitored.lock() = Some(zone.id.clone());
        debug!(zone = %zone.id, "sim_monitoring_started");
        Ok(())
    }

    async fn stop_monitoring(&self) {
        *self.monitored.lock() = None;
        *self.last_state.lock() = GeofenceState::Unknown;
        debug!("sim_monitoring_stopped");
    }

    async fn request_state(&self, zone: &Zone) {
        let state = *self.last_state.lock();
        let _ = self.events.send(LocationEvent::StateDetermined(zone.id.clone(), state)).await;
    }

    async fn request_authorization(&self) {
        // The scripted user grants the prompt; an already-decided level is
        // just re-delivered.
        let status = {
            let mut authorization = self.authorization.lock();
            if *authorization == AuthorizationStatus::NotDetermined {
                *authorization = AuthorizationStatus::Always;
            }
            *authorization
        };
        let _ = self.events.send(LocationEvent::AuthorizationChanged(status)).await;
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        *self.authorization.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> Zone {
        Zone {
            id: ZoneId::from("galeria-branch"),
            name: "Sucursal Saladillo".to_string(),
            latitude: -35.6330328,
            longitude: -59.7783535,
            radius_m: 10.0,
        }
    }

    #[tokio::test]
    async fn test_start_requires_availability() {
        let (tx, _rx) = mpsc::channel(8);
        let provider = SimulatedProvider::without_region_support(tx);

        let result = provider.start_monitoring(&zone()).await;
        assert_eq!(result, Err(GeofenceError::MonitoringUnavailable));
    }

    #[tokio::test]
    async fn test_start_requires_always_authorization() {
        let (tx, _rx) = mpsc::channel(8);
        let provider = SimulatedProvider::with_authorization(tx, AuthorizationStatus::WhenInUse);

        let result = provider.start_monitoring(&zone()).await;
        assert_eq!(result, Err(GeofenceError::InsufficientPermissions));
    }

    #[tokio::test]
    async fn test_request_authorization_grants_when_undetermined() {
        let (tx, mut rx) = mpsc::channel(8);
        let provider =
            SimulatedProvider::with_authorization(tx, AuthorizationStatus::NotDetermined);

        provider.request_authorization().await;

        assert_eq!(provider.authorization_status(), AuthorizationStatus::Always);
        let event = rx.recv().await.unwrap();
        assert_eq!(event, LocationEvent::AuthorizationChanged(AuthorizationStatus::Always));
    }

    #[tokio::test]
    async fn test_request_authorization_keeps_denied() {
        let (tx, mut rx) = mpsc::channel(8);
        let provider = SimulatedProvider::with_authorization(tx, AuthorizationStatus::Denied);

        provider.request_authorization().await;

        assert_eq!(provider.authorization_status(), AuthorizationStatus::Denied);
        let event = rx.recv().await.unwrap();
        assert_eq!(event, LocationEvent::AuthorizationChanged(AuthorizationStatus::Denied));
    }

    #[tokio::test]
    async fn test_request_state_delivers_event() {
        let (tx, mut rx) = mpsc::channel(8);
        let provider = SimulatedProvider::new(tx);
        let zone = zone();

        provider.start_monitoring(&zone).await.unwrap();
        provider.set_region_state(GeofenceState::Inside);
        provider.request_state(&zone).await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event, LocationEvent::StateDetermined(zone.id, GeofenceState::Inside));
    }

    #[tokio::test]
    async fn test_region_events_need_registration() {
        let (tx, mut rx) = mpsc::channel(8);
        let provider = SimulatedProvider::new(tx);

        // No zone registered, nothing delivered
        provider.push_region_enter().await;

        provider.start_monitoring(&zone()).await.unwrap();
        provider.push_region_enter().await;

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, LocationEvent::RegionEnter(_)));
        assert!(rx.try_recv().is_err());
    }
}
