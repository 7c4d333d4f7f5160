//! Domain models - core business types and the visit model
//!
//! This module contains the canonical data types used throughout the system:
//! - `Visit` - the primary business entity, one record per branch stay
//! - `Zone` - the monitored circular region around a branch
//! - `LocationEvent` - tagged events from the location provider
//! - `GeofenceState` / `StateTransition` - derived geofence state
//! - error enums surfaced by the tracker and the lifecycle manager

pub mod error;
pub mod geo;
pub mod types;
pub mod visit;
