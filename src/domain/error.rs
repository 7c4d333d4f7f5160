//! Error kinds surfaced by the geofence tracker and the visit manager

use thiserror::Error;

/// Geofence monitoring failures.
///
/// `MonitoringUnavailable` and `InsufficientPermissions` are terminal for
/// the current monitoring attempt; `RegionMonitoringFailed` is transient and
/// the caller may retry by re-invoking `start_monitoring`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeofenceError {
    #[error("region monitoring is not available on this platform")]
    MonitoringUnavailable,
    #[error("insufficient location permissions for region monitoring")]
    InsufficientPermissions,
    #[error("region monitoring failed: {0}")]
    RegionMonitoringFailed(String),
    /// Operation needs a monitored zone and none is registered
    #[error("no zone is currently monitored")]
    NotMonitoring,
}

/// Visit persistence and lifecycle failures.
///
/// A persistence failure aborts the in-progress transition before any
/// notification side effect is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VisitError {
    #[error("failed to save visit")]
    SaveFailed,
    #[error("failed to update visit")]
    UpdateFailed,
    #[error("failed to fetch visits")]
    FetchFailed,
    /// No visit matches the operation, e.g. an exit or service selection
    /// with no open visit. Signals tracker/lifecycle desynchronization.
    #[error("visit not found")]
    NotFound,
}
