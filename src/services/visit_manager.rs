//! Visit lifecycle management
//!
//! Enforces the at-most-one-open-visit invariant and drives persistence and
//! notification side effects from geofence transitions. All check-then-act
//! sequences (entry-check-and-create, exit-check-and-close, service
//! selection) run under a single async mutex, so two near-simultaneous
//! callbacks cannot both observe "no open visit" and both create one.
//!
//! Side-effect ordering: the store write completes before any notification
//! is attempted, and a persistence failure aborts the transition outright.

use crate::domain::error::VisitError;
use crate::domain::types::{ServiceCategory, Zone};
use crate::domain::visit::{format_duration, Visit};
use crate::io::notify::{LocalAlert, NotificationEmitter};
use crate::io::store::VisitStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Explicit lifecycle state; transitions are exhaustive over this enum
/// rather than inferred from the nullability of a visit reference.
enum VisitState {
    NoOpenVisit,
    OpenVisit {
        visit: Visit,
        /// Display name for the exit notification. Recovered visits only
        /// know their zone id and fall back to it.
        zone_name: String,
    },
}

pub struct VisitManager {
    state: Mutex<VisitState>,
    store: Arc<dyn VisitStore>,
    notifier: Arc<dyn NotificationEmitter>,
}

impl VisitManager {
    /// Construct the manager, adopting any open visit a previous process
    /// left behind instead of assuming a clean start.
    pub async fn recover(
        store: Arc<dyn VisitStore>,
        notifier: Arc<dyn NotificationEmitter>,
    ) -> Self {
        let state = match store.fetch_open_visit().await {
            Ok(Some(visit)) => {
                info!(id = %visit.id, zone = %visit.zone_id, "open_visit_recovered");
                let zone_name = visit.zone_id.to_string();
                VisitState::OpenVisit { visit, zone_name }
            }
            Ok(None) => VisitState::NoOpenVisit,
            Err(e) => {
                warn!(error = %e, "open_visit_recovery_failed");
                VisitState::NoOpenVisit
            }
        };

        Self { state: Mutex::new(state), store, notifier }
    }

    /// Open a visit for an entry edge.
    ///
    /// An entry while a visit is already open is a no-op that returns the
    /// existing visit: duplicate and late-retried provider callbacks are
    /// expected, not errors. The store's create is invoked exactly once per
    /// visit.
    pub async fn start_visit(&self, zone: &Zone) -> Result<Visit, VisitError> {
        let mut state = self.state.lock().await;

        if let VisitState::OpenVisit { visit, .. } = &*state {
            debug!(id = %visit.id, zone = %zone.id, "entry_with_open_visit_ignored");
            return Ok(visit.clone());
        }

        let visit = Visit::new(zone.id.clone());
        let saved = self.store.create(&visit).await?;
        info!(id = %saved.id, zone = %zone.id, "visit_opened");

        *state = VisitState::OpenVisit { visit: saved.clone(), zone_name: zone.name.clone() };
        self.notifier.schedule_local_alert(LocalAlert::entry(zone));
        Ok(saved)
    }

    /// Close the open visit for an exit edge.
    ///
    /// Fails with `NotFound` when no visit is open; that case is surfaced
    /// to the caller because it signals tracker/lifecycle desync. An update
    /// failure keeps the visit open.
    pub async fn end_visit(&self) -> Result<Visit, VisitError> {
        let mut state = self.state.lock().await;

        let (visit, zone_name) = match &*state {
            VisitState::OpenVisit { visit, zone_name } => (visit.clone(), zone_name.clone()),
            VisitState::NoOpenVisit => return Err(VisitError::NotFound),
        };

        let mut closed = visit;
        closed.close(Utc::now());
        let saved = self.store.update(&closed).await?;

        let duration = saved.duration().unwrap_or_else(chrono::Duration::zero);
        info!(
            id = %saved.id,
            zone = %saved.zone_id,
            duration_secs = duration.num_seconds(),
            "visit_closed"
        );

        *state = VisitState::NoOpenVisit;
        self.notifier.schedule_local_alert(LocalAlert::exit(
            &saved.zone_id.to_string(),
            &zone_name,
            &format_duration(duration),
        ));
        Ok(saved)
    }

    /// Attach the selected service to the open visit. Re-selection before
    /// the visit closes overwrites the previous choice.
    pub async fn select_service(&self, category: ServiceCategory) -> Result<Visit, VisitError> {
        let mut state = self.state.lock().await;

        let VisitState::OpenVisit { visit, .. } = &mut *state else {
            return Err(VisitError::NotFound);
        };

        let previous = visit.service;
        let mut updated = visit.clone();
        updated.service = Some(category);
        let saved = self.store.update(&updated).await?;

        match previous {
            Some(previous) if previous != category => {
                debug!(id = %saved.id, from = %previous.label(), to = %category.label(), "service_reselected");
            }
            _ => info!(id = %saved.id, service = %category.label(), "service_selected"),
        }

        *visit = saved.clone();
        Ok(saved)
    }

    /// All visits, read-only, most-recent entry first
    pub async fn visit_history(&self) -> Result<Vec<Visit>, VisitError> {
        self.store.fetch_all().await
    }

    pub async fn has_open_visit(&self) -> bool {
        matches!(&*self.state.lock().await, VisitState::OpenVisit { .. })
    }

    pub async fn current_visit(&self) -> Option<Visit> {
        match &*self.state.lock().await {
            VisitState::OpenVisit { visit, .. } => Some(visit.clone()),
            VisitState::NoOpenVisit => None,
        }
    }
}
