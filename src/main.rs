//! Branch Visits - geofence-driven visit tracking for a bank branch
//!
//! Derives entry/exit transitions for a single monitored branch zone and
//! records visits with entry time, exit time, and the service the customer
//! came in for.
//!
//! Module structure:
//! - `domain/` - Core business types (Zone, Visit, Events)
//! - `io/` - External interfaces (Location provider, Store, Notifications, Analytics)
//! - `services/` - Business logic (Tracker, GeofenceTracker, VisitManager)
//! - `infra/` - Infrastructure (Config, Metrics)

use branch_visits::domain::geo;
use branch_visits::domain::types::{LocationSample, ServiceCategory};
use branch_visits::infra::{Config, Metrics};
use branch_visits::io::{
    JsonFileVisitStore, LocationProvider, NoopNotifier, NotificationEmitter, SimulatedProvider,
    TracingAnalytics, TracingNotifier, VisitStore,
};
use branch_visits::services::{GeofenceTracker, Tracker, VisitManager};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Branch Visits - geofence-driven branch visit tracker
#[derive(Parser, Debug)]
#[command(name = "branch-visits", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("branch-visits starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        zone_id = %config.zone_id(),
        zone_name = %config.zone_name(),
        radius_m = %config.zone_radius_m(),
        store_file = %config.store_file(),
        notifications = %config.notifications_enabled(),
        "config_loaded"
    );

    // Create shutdown signal; two tasks need to be able to fire it
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    // Create event channel (bounded for backpressure)
    let (event_tx, event_rx) = mpsc::channel(config.event_buffer());

    // Shared components
    let store: Arc<dyn VisitStore> = Arc::new(JsonFileVisitStore::open(config.store_file()));
    let notifier: Arc<dyn NotificationEmitter> = if config.notifications_enabled() {
        Arc::new(TracingNotifier)
    } else {
        Arc::new(NoopNotifier)
    };
    let analytics = Arc::new(TracingAnalytics);
    let metrics = Arc::new(Metrics::new());

    // Adopt a visit left open by a previous run, if any
    let visits = Arc::new(VisitManager::recover(store.clone(), notifier).await);

    let provider = Arc::new(SimulatedProvider::new(event_tx));
    let geofence = GeofenceTracker::new(provider.clone() as Arc<dyn LocationProvider>);
    let mut tracker = Tracker::new(geofence, visits.clone(), analytics, metrics.clone());

    tracker.start_monitoring(config.monitored_zone()).await?;
    info!("tracker_started");

    // Periodic metrics summary
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Scripted walk through the zone, standing in for a real location feed
    let zone = config.monitored_zone();
    let demo_provider = provider.clone();
    let demo_visits = visits.clone();
    let demo_shutdown = shutdown_tx.clone();
    tokio::spawn(async move {
        let step = std::time::Duration::from_millis(500);

        // Approach from 50 meters out
        tokio::time::sleep(step).await;
        demo_provider
            .push_sample(LocationSample {
                latitude: zone.latitude + geo::meters_to_lat_degrees(50.0),
                longitude: zone.longitude,
                accuracy_m: Some(10.0),
            })
            .await;

        // Cross the boundary
        tokio::time::sleep(step).await;
        demo_provider.push_region_enter().await;

        // A redundant inside fix; the dedup gate suppresses it
        tokio::time::sleep(step).await;
        demo_provider
            .push_sample(LocationSample {
                latitude: zone.latitude + geo::meters_to_lat_degrees(3.0),
                longitude: zone.longitude,
                accuracy_m: Some(5.0),
            })
            .await;

        if let Err(e) = demo_visits.select_service(ServiceCategory::Teller).await {
            tracing::warn!(error = %e, "demo_service_selection_failed");
        }

        // Leave
        tokio::time::sleep(step).await;
        demo_provider.push_region_exit().await;

        tokio::time::sleep(step).await;
        match demo_visits.visit_history().await {
            Ok(history) => info!(visits = history.len(), "visit_history"),
            Err(e) => tracing::warn!(error = %e, "visit_history_failed"),
        }

        let _ = demo_shutdown.send(true);
    });

    // Handle shutdown on Ctrl+C
    let signal_shutdown = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = signal_shutdown.send(true);
    });

    // Run tracker - consumes events until the channel closes or shutdown fires
    tracker.run(event_rx, shutdown_rx).await;

    metrics.report().log();
    info!("branch-visits shutdown complete");
    Ok(())
}
