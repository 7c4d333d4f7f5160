//! Visit persistence behind a repository trait
//!
//! The core never touches storage internals; it drives the `VisitStore`
//! contract and treats every call as asynchronous with an explicit
//! success/failure outcome.

use crate::domain::error::VisitError;
use crate::domain::visit::Visit;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Durable record keeper for visits.
///
/// `fetch_all` returns visits ordered most-recent entry first. At most one
/// visit has no exit time at any point; `fetch_open_visit` returns it.
#[async_trait]
pub trait VisitStore: Send + Sync {
    async fn create(&self, visit: &Visit) -> Result<Visit, VisitError>;
    async fn update(&self, visit: &Visit) -> Result<Visit, VisitError>;
    async fn fetch_all(&self) -> Result<Vec<Visit>, VisitError>;
    async fn fetch_open_visit(&self) -> Result<Option<Visit>, VisitError>;
    /// Bulk clear, exposed for external tooling only
    async fn delete_all(&self) -> Result<(), VisitError>;
}

fn most_recent_first(visits: &mut [Visit]) {
    visits.sort_by(|a, b| b.entry_time.cmp(&a.entry_time));
}

/// In-memory store for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryVisitStore {
    visits: RwLock<Vec<Visit>>,
}

impl MemoryVisitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VisitStore for MemoryVisitStore {
    async fn create(&self, visit: &Visit) -> Result<Visit, VisitError> {
        self.visits.write().push(visit.clone());
        Ok(visit.clone())
    }

    async fn update(&self, visit: &Visit) -> Result<Visit, VisitError> {
        let mut visits = self.visits.write();
        match visits.iter_mut().find(|v| v.id == visit.id) {
            Some(slot) => {
                *slot = visit.clone();
                Ok(visit.clone())
            }
            None => Err(VisitError::NotFound),
        }
    }

    async fn fetch_all(&self) -> Result<Vec<Visit>, VisitError> {
        let mut visits = self.visits.read().clone();
        most_recent_first(&mut visits);
        Ok(visits)
    }

    async fn fetch_open_visit(&self) -> Result<Option<Visit>, VisitError> {
        Ok(self.visits.read().iter().find(|v| v.is_open()).cloned())
    }

    async fn delete_all(&self) -> Result<(), VisitError> {
        self.visits.write().clear();
        Ok(())
    }
}

/// File-backed store: keeps the visit list in memory and rewrites a JSON
/// snapshot on every mutation. A failed write rolls the in-memory list back
/// so memory and disk never diverge.
pub struct JsonFileVisitStore {
    path: PathBuf,
    visits: RwLock<Vec<Visit>>,
}

impl JsonFileVisitStore {
    /// Open the store, loading existing visits from `path` if present
    pub fn open<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let visits: Vec<Visit> = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                error!(path = %path.display(), error = %e, "visit_store_unreadable");
                Vec::new()
            }),
            Err(_) => Vec::new(),
        };

        info!(path = %path.display(), count = visits.len(), "visit_store_opened");
        Self { path, visits: RwLock::new(visits) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, visits: &[Visit]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(visits)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), count = visits.len(), "visit_store_written");
        Ok(())
    }
}

#[async_trait]
impl VisitStore for JsonFileVisitStore {
    async fn create(&self, visit: &Visit) -> Result<Visit, VisitError> {
        let mut visits = self.visits.write();
        visits.push(visit.clone());

        if let Err(e) = self.persist(&visits) {
            visits.pop();
            error!(id = %visit.id, error = %e, "visit_create_failed");
            return Err(VisitError::SaveFailed);
        }
        debug!(id = %visit.id, zone = %visit.zone_id, "visit_created");
        Ok(visit.clone())
    }

    async fn update(&self, visit: &Visit) -> Result<Visit, VisitError> {
        let mut visits = self.visits.write();
        let Some(idx) = visits.iter().position(|v| v.id == visit.id) else {
            return Err(VisitError::NotFound);
        };

        let previous = std::mem::replace(&mut visits[idx], visit.clone());
        if let Err(e) = self.persist(&visits) {
            visits[idx] = previous;
            error!(id = %visit.id, error = %e, "visit_update_failed");
            return Err(VisitError::UpdateFailed);
        }
        debug!(id = %visit.id, "visit_updated");
        Ok(visit.clone())
    }

    async fn fetch_all(&self) -> Result<Vec<Visit>, VisitError> {
        let mut visits = self.visits.read().clone();
        most_recent_first(&mut visits);
        Ok(visits)
    }

    async fn fetch_open_visit(&self) -> Result<Option<Visit>, VisitError> {
        Ok(self.visits.read().iter().find(|v| v.is_open()).cloned())
    }

    async fn delete_all(&self) -> Result<(), VisitError> {
        let mut visits = self.visits.write();
        let previous = std::mem::take(&mut *visits);
        if let Err(e) = self.persist(&visits) {
            *visits = previous;
            error!(error = %e, "visit_delete_all_failed");
            return Err(VisitError::SaveFailed);
        }
        Ok(())
    }
}
