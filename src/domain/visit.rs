//! Visit data model - one record per entry/exit bounded stay at a branch

use crate::domain::types::{ServiceCategory, ZoneId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable) visit ID
pub fn new_visit_id() -> Uuid {
    Uuid::now_v7()
}

/// A single stay at a branch, bounded by an entry edge and an exit edge.
///
/// `entry_time` is immutable after creation and `exit_time` is set exactly
/// once; both are enforced by routing every mutation through the
/// `VisitManager`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: Uuid,
    pub zone_id: ZoneId,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub service: Option<ServiceCategory>,
}

impl Visit {
    pub fn new(zone_id: ZoneId) -> Self {
        Self {
            id: new_visit_id(),
            zone_id,
            entry_time: Utc::now(),
            exit_time: None,
            service: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }

    /// Close the visit. A clock that went backwards between entry and exit
    /// is clamped to the entry time so the duration stays non-negative.
    pub fn close(&mut self, at: DateTime<Utc>) {
        self.exit_time = Some(at.max(self.entry_time));
    }

    /// Defined only once the visit is closed; always non-negative
    pub fn duration(&self) -> Option<Duration> {
        self.exit_time.map(|exit| exit - self.entry_time)
    }
}

/// Human-readable duration for the exit notification
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours} hours, {minutes} minutes")
    } else if minutes > 0 {
        format!("{minutes} minutes, {seconds} seconds")
    } else {
        format!("{seconds} seconds")
    }
}
