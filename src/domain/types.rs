//! Shared types for branch visit tracking

use serde::{Deserialize, Serialize};

/// Newtype wrapper for zone IDs to provide type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub String);

impl ZoneId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ZoneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A monitored branch zone: a circular region around a fixed coordinate.
///
/// Immutable once monitoring starts; replacing the monitored zone requires
/// an explicit stop + start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Radius in meters, must be positive
    pub radius_m: f64,
}

/// Geofence state relative to the monitored zone.
///
/// `Unknown` is the only valid value before any sample or state query has
/// resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeofenceState {
    Inside,
    Outside,
    #[default]
    Unknown,
}

impl GeofenceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeofenceState::Inside => "inside",
            GeofenceState::Outside => "outside",
            GeofenceState::Unknown => "unknown",
        }
    }
}

/// Raw position sample from the location provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters, if the provider reports one
    pub accuracy_m: Option<f64>,
}

/// Location authorization level reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    WhenInUse,
    Always,
    Denied,
    Restricted,
}

impl AuthorizationStatus {
    /// Background region monitoring requires the `Always` level
    pub fn allows_monitoring(&self) -> bool {
        matches!(self, AuthorizationStatus::Always)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationStatus::NotDetermined => "not_determined",
            AuthorizationStatus::WhenInUse => "when_in_use",
            AuthorizationStatus::Always => "always",
            AuthorizationStatus::Denied => "denied",
            AuthorizationStatus::Restricted => "restricted",
        }
    }
}

/// Tagged event from the location provider.
///
/// All provider callback paths funnel into one serialized stream of these,
/// so partial updates from interleaved callbacks cannot occur.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    Sample(LocationSample),
    RegionEnter(ZoneId),
    RegionExit(ZoneId),
    StateDetermined(ZoneId, GeofenceState),
    AuthorizationChanged(AuthorizationStatus),
    MonitoringFailed(String),
}

/// Which detection path produced a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionSource {
    /// Native region enter/exit callback
    RegionEvent,
    /// Distance classification of a raw position sample
    DistanceClassification,
    /// Answer to an explicit state query
    StateQuery,
}

impl TransitionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionSource::RegionEvent => "region_event",
            TransitionSource::DistanceClassification => "distance",
            TransitionSource::StateQuery => "state_query",
        }
    }
}

/// Edge-triggered state change emitted by the geofence tracker
#[derive(Debug, Clone, PartialEq)]
pub struct StateTransition {
    pub zone_id: ZoneId,
    pub from: GeofenceState,
    pub to: GeofenceState,
    pub source: TransitionSource,
}

/// Service a customer can select during an open visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Teller,
    PersonalizedService,
    PersonalLoans,
    Other,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 4] = [
        ServiceCategory::Teller,
        ServiceCategory::PersonalizedService,
        ServiceCategory::PersonalLoans,
        ServiceCategory::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ServiceCategory::Teller => "Teller service",
            ServiceCategory::PersonalizedService => "Personalized service",
            ServiceCategory::PersonalLoans => "Personal loans",
            ServiceCategory::Other => "Other procedures",
        }
    }

    /// Symbol name used by host UIs
    pub fn icon(&self) -> &'static str {
        match self {
            ServiceCategory::Teller => "banknote",
            ServiceCategory::PersonalizedService => "person.2",
            ServiceCategory::PersonalLoans => "creditcard",
            ServiceCategory::Other => "doc.text",
        }
    }
}
