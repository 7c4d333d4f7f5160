//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::types::{Zone, ZoneId};
use anyhow::{bail, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneConfig {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_radius_m")]
    pub radius_m: f64,
}

fn default_radius_m() -> f64 {
    10.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// File path for persisted visits (JSON snapshot)
    #[serde(default = "default_store_file")]
    pub file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { file: default_store_file() }
    }
}

fn default_store_file() -> String {
    "visits.json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_notifications_enabled")]
    pub enabled: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: default_notifications_enabled() }
    }
}

fn default_notifications_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EventsConfig {
    /// Capacity of the location event channel
    #[serde(default = "default_event_buffer")]
    pub buffer: usize,
}

fn default_event_buffer() -> usize {
    256
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    pub zone: ZoneConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    zone_id: String,
    zone_name: String,
    zone_latitude: f64,
    zone_longitude: f64,
    zone_radius_m: f64,
    store_file: String,
    notifications_enabled: bool,
    metrics_interval_secs: u64,
    event_buffer: usize,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zone_id: "galeria-branch".to_string(),
            zone_name: "Sucursal Saladillo".to_string(),
            zone_latitude: -35.6330328,
            zone_longitude: -59.7783535,
            zone_radius_m: 10.0,
            store_file: "visits.json".to_string(),
            notifications_enabled: true,
            metrics_interval_secs: 10,
            event_buffer: 256,
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        // Check for --config argument
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        // Check CONFIG_FILE environment variable
        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        // Default to dev.toml
        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        if toml_config.zone.radius_m <= 0.0 {
            bail!(
                "zone.radius_m must be positive in {} (got {})",
                path.display(),
                toml_config.zone.radius_m
            );
        }
        if toml_config.zone.id.is_empty() {
            bail!("zone.id must not be empty in {}", path.display());
        }

        Ok(Self {
            zone_id: toml_config.zone.id,
            zone_name: toml_config.zone.name,
            zone_latitude: toml_config.zone.latitude,
            zone_longitude: toml_config.zone.longitude,
            zone_radius_m: toml_config.zone.radius_m,
            store_file: toml_config.store.file,
            notifications_enabled: toml_config.notifications.enabled,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            event_buffer: toml_config.events.buffer,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load(args: &[String]) -> Self {
        let config_path = Self::resolve_config_path(args);

        match Self::from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Load configuration from an explicit path, falling back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// The zone this instance monitors
    pub fn monitored_zone(&self) -> Zone {
        Zone {
            id: ZoneId::from(self.zone_id.as_str()),
            name: self.zone_name.clone(),
            latitude: self.zone_latitude,
            longitude: self.zone_longitude,
            radius_m: self.zone_radius_m,
        }
    }

    // Getters for all config fields
    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn zone_name(&self) -> &str {
        &self.zone_name
    }

    pub fn zone_radius_m(&self) -> f64 {
        self.zone_radius_m
    }

    pub fn store_file(&self) -> &str {
        &self.store_file
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn event_buffer(&self) -> usize {
        self.event_buffer
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}
