//! Tests for the Tracker module

use super::*;
use crate::domain::geo;
use crate::domain::types::{
    AuthorizationStatus, GeofenceState, LocationSample, ServiceCategory, ZoneId,
};
use crate::io::analytics::RecordingAnalytics;
use crate::io::location::SimulatedProvider;
use crate::io::notify::RecordingNotifier;
use crate::io::store::{MemoryVisitStore, VisitStore};

const BRANCH_LAT: f64 = -35.6330328;
const BRANCH_LON: f64 = -59.7783535;

fn branch_zone() -> Zone {
    Zone {
        id: ZoneId::from("galeria-branch"),
        name: "Sucursal Saladillo".to_string(),
        latitude: BRANCH_LAT,
        longitude: BRANCH_LON,
        radius_m: 10.0,
    }
}

fn sample_at_meters(meters: f64) -> LocationEvent {
    LocationEvent::Sample(LocationSample {
        latitude: BRANCH_LAT + geo::meters_to_lat_degrees(meters),
        longitude: BRANCH_LON,
        accuracy_m: Some(5.0),
    })
}

fn region_enter() -> LocationEvent {
    LocationEvent::RegionEnter(ZoneId::from("galeria-branch"))
}

fn region_exit() -> LocationEvent {
    LocationEvent::RegionExit(ZoneId::from("galeria-branch"))
}

/// Test harness keeping the event receiver and collaborators alive
struct TestTracker {
    tracker: Tracker,
    store: Arc<MemoryVisitStore>,
    notifier: Arc<RecordingNotifier>,
    analytics: Arc<RecordingAnalytics>,
    #[allow(dead_code)]
    events_rx: mpsc::Receiver<LocationEvent>,
}

impl std::ops::Deref for TestTracker {
    type Target = Tracker;
    fn deref(&self) -> &Self::Target {
        &self.tracker
    }
}

impl std::ops::DerefMut for TestTracker {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.tracker
    }
}

async fn create_test_tracker() -> TestTracker {
    let (event_tx, events_rx) = mpsc::channel(64);
    let provider = Arc::new(SimulatedProvider::new(event_tx));
    let store = Arc::new(MemoryVisitStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let analytics = Arc::new(RecordingAnalytics::default());
    let metrics = Arc::new(Metrics::new());

    let visits = Arc::new(VisitManager::recover(store.clone(), notifier.clone()).await);
    let geofence = GeofenceTracker::new(provider);
    let mut tracker = Tracker::new(geofence, visits, analytics.clone(), metrics);
    tracker.start_monitoring(branch_zone()).await.unwrap();

    TestTracker { tracker, store, notifier, analytics, events_rx }
}

#[tokio::test]
async fn test_entry_edge_opens_visit() {
    let mut t = create_test_tracker().await;

    t.process_event(sample_at_meters(5.0)).await;

    assert!(t.has_open_visit().await);
    let visits = t.store.fetch_all().await.unwrap();
    assert_eq!(visits.len(), 1);
    assert!(visits[0].is_open());
    assert_eq!(t.metrics.visits_opened(), 1);
}

#[tokio::test]
async fn test_repeated_inside_samples_emit_once() {
    let mut t = create_test_tracker().await;

    t.process_event(sample_at_meters(5.0)).await;
    t.process_event(sample_at_meters(5.0)).await;
    t.process_event(sample_at_meters(7.0)).await;

    assert_eq!(t.metrics.transitions_emitted(), 1);
    assert_eq!(t.store.fetch_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_double_entry_edges_create_one_visit() {
    let mut t = create_test_tracker().await;

    t.process_event(region_enter()).await;
    t.process_event(region_enter()).await;
    t.process_event(sample_at_meters(3.0)).await;

    let visits = t.store.fetch_all().await.unwrap();
    assert_eq!(visits.len(), 1);
    assert!(t.has_open_visit().await);
}

#[tokio::test]
async fn test_entry_then_exit_closes_same_visit() {
    let mut t = create_test_tracker().await;

    t.process_event(region_enter()).await;
    let opened = t.store.fetch_all().await.unwrap()[0].clone();

    t.process_event(region_exit()).await;

    assert!(!t.has_open_visit().await);
    let visits = t.store.fetch_all().await.unwrap();
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].id, opened.id);
    assert!(!visits[0].is_open());
    assert!(visits[0].duration().unwrap() >= chrono::Duration::zero());
    assert_eq!(t.metrics.visits_closed(), 1);
}

#[tokio::test]
async fn test_region_exit_without_visit_is_reported_desync() {
    let mut t = create_test_tracker().await;

    // Exit edge straight from Unknown, never having entered
    t.process_event(region_exit()).await;

    assert!(t.store.fetch_all().await.unwrap().is_empty());
    assert_eq!(t.metrics.desyncs(), 1);
    assert!(t
        .analytics
        .errors()
        .iter()
        .any(|(_, context)| context == "end_visit"));
}

#[tokio::test]
async fn test_outside_sample_from_unknown_is_not_an_exit() {
    let mut t = create_test_tracker().await;

    // First signal ever says outside: state resolves, no visit action
    t.process_event(sample_at_meters(50.0)).await;

    assert_eq!(t.geofence.last_reported(), GeofenceState::Outside);
    assert!(t.store.fetch_all().await.unwrap().is_empty());
    assert_eq!(t.metrics.desyncs(), 0);
}

#[tokio::test]
async fn test_region_and_distance_agreeing_produce_one_visit() {
    let mut t = create_test_tracker().await;

    // Both detection paths observe the same walk-in; the second is a no-op
    t.process_event(region_enter()).await;
    t.process_event(sample_at_meters(4.0)).await;

    assert_eq!(t.metrics.transitions_emitted(), 1);
    assert_eq!(t.store.fetch_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_full_visit_with_service_selection() {
    let mut t = create_test_tracker().await;

    t.process_event(sample_at_meters(2.0)).await;
    t.tracker.visits.select_service(ServiceCategory::Teller).await.unwrap();
    t.process_event(region_exit()).await;

    let visits = t.store.fetch_all().await.unwrap();
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].service, Some(ServiceCategory::Teller));
    assert!(!visits[0].is_open());

    // Entry and exit notifications, persisted before either fired
    let alerts = t.notifier.alerts();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].metadata.get("type").map(String::as_str), Some("entry"));
    assert_eq!(alerts[1].metadata.get("type").map(String::as_str), Some("exit"));
}

#[tokio::test]
async fn test_monitoring_failure_is_logged_not_fatal() {
    let mut t = create_test_tracker().await;

    t.process_event(LocationEvent::MonitoringFailed("radio fault".to_string())).await;
    assert_eq!(t.metrics.monitoring_failures(), 1);
    assert!(t
        .analytics
        .errors()
        .iter()
        .any(|(_, context)| context == "region_monitoring"));

    // Pipeline still works afterwards
    t.process_event(sample_at_meters(5.0)).await;
    assert!(t.has_open_visit().await);
}

#[tokio::test]
async fn test_authorization_change_is_logged() {
    let mut t = create_test_tracker().await;

    t.process_event(LocationEvent::AuthorizationChanged(AuthorizationStatus::Always)).await;

    assert!(t
        .analytics
        .events()
        .iter()
        .any(|(name, _)| name == "location_permission_changed"));
}

#[tokio::test]
async fn test_run_loop_processes_until_shutdown() {
    let (event_tx, events_rx) = mpsc::channel(64);
    let provider = Arc::new(SimulatedProvider::new(event_tx.clone()));
    let store = Arc::new(MemoryVisitStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let analytics = Arc::new(RecordingAnalytics::default());
    let metrics = Arc::new(Metrics::new());

    let visits = Arc::new(VisitManager::recover(store.clone(), notifier).await);
    let geofence = GeofenceTracker::new(provider.clone());
    let mut tracker = Tracker::new(geofence, visits, analytics, metrics);
    tracker.start_monitoring(branch_zone()).await.unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        tracker.run(events_rx, shutdown_rx).await;
        tracker
    });

    provider.push_region_enter().await;
    provider.push_region_exit().await;
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    shutdown_tx.send(true).unwrap();

    let tracker = handle.await.unwrap();
    assert!(!tracker.has_open_visit().await);
    let persisted = store.fetch_all().await.unwrap();
    assert_eq!(persisted.len(), 1);
    assert!(!persisted[0].is_open());
}
