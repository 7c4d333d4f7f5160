//! Services - business logic and state management
//!
//! This module contains the core business logic services:
//! - `geofence` - Geofence state machine (one monitored zone, de-duplicated
//!   inside/outside/unknown state, edge-triggered transitions)
//! - `visit_manager` - Visit lifecycle (at most one open visit, persistence,
//!   notification side effects)
//! - `tracker` - Event orchestrator consuming the location event stream

pub mod geofence;
pub mod tracker;
pub mod visit_manager;

// Re-export commonly used types
pub use geofence::GeofenceTracker;
pub use tracker::Tracker;
pub use visit_manager::VisitManager;
