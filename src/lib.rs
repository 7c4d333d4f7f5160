//! Branch visit tracking core
//!
//! Library-level geofence state machine and visit lifecycle manager,
//! intended to be embedded in a host application.
//!
//! Module structure:
//! - `domain/` - Core business types (Zone, Visit, LocationEvent, errors)
//! - `io/` - External collaborators (location provider, visit store, emitters)
//! - `services/` - Business logic (GeofenceTracker, VisitManager, Tracker)
//! - `infra/` - Infrastructure (Config, Metrics)

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
