//! Lock-free counters for the geofence pipeline

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Pipeline counters, safe to bump from any task without locking
#[derive(Default)]
pub struct Metrics {
    events_processed: AtomicU64,
    transitions_emitted: AtomicU64,
    visits_opened: AtomicU64,
    visits_closed: AtomicU64,
    desyncs: AtomicU64,
    store_failures: AtomicU64,
    monitoring_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transition(&self) {
        self.transitions_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_visit_opened(&self) {
        self.visits_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_visit_closed(&self) {
        self.visits_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_desync(&self) {
        self.desyncs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_monitoring_failure(&self) {
        self.monitoring_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed.load(Ordering::Relaxed)
    }

    pub fn transitions_emitted(&self) -> u64 {
        self.transitions_emitted.load(Ordering::Relaxed)
    }

    pub fn visits_opened(&self) -> u64 {
        self.visits_opened.load(Ordering::Relaxed)
    }

    pub fn visits_closed(&self) -> u64 {
        self.visits_closed.load(Ordering::Relaxed)
    }

    pub fn desyncs(&self) -> u64 {
        self.desyncs.load(Ordering::Relaxed)
    }

    pub fn store_failures(&self) -> u64 {
        self.store_failures.load(Ordering::Relaxed)
    }

    pub fn monitoring_failures(&self) -> u64 {
        self.monitoring_failures.load(Ordering::Relaxed)
    }

    /// Snapshot for the periodic summary log
    pub fn report(&self) -> MetricsSummary {
        MetricsSummary {
            events_processed: self.events_processed(),
            transitions_emitted: self.transitions_emitted(),
            visits_opened: self.visits_opened(),
            visits_closed: self.visits_closed(),
            desyncs: self.desyncs(),
            store_failures: self.store_failures(),
            monitoring_failures: self.monitoring_failures(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSummary {
    pub events_processed: u64,
    pub transitions_emitted: u64,
    pub visits_opened: u64,
    pub visits_closed: u64,
    pub desyncs: u64,
    pub store_failures: u64,
    pub monitoring_failures: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            events = self.events_processed,
            transitions = self.transitions_emitted,
            visits_opened = self.visits_opened,
            visits_closed = self.visits_closed,
            desyncs = self.desyncs,
            store_failures = self.store_failures,
            monitoring_failures = self.monitoring_failures,
            "metrics_summary"
        );
    }
}
