//! IO modules - external collaborator interfaces
//!
//! This module contains the traits the core consumes, plus in-repo
//! implementations:
//! - `location` - location provider trait and a scripted simulator
//! - `store` - visit persistence trait, in-memory and JSON-file stores
//! - `notify` - fire-and-forget local notification emission
//! - `analytics` - fire-and-forget analytics emission

pub mod analytics;
pub mod location;
pub mod notify;
pub mod store;

// Re-export commonly used types
pub use analytics::{AnalyticsEmitter, TracingAnalytics};
pub use location::{LocationProvider, SimulatedProvider};
pub use notify::{LocalAlert, NoopNotifier, NotificationEmitter, TracingNotifier};
pub use store::{JsonFileVisitStore, MemoryVisitStore, VisitStore};
