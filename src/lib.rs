//! Kinship Canvas
//!
//! A collaborative family-tree graph engine with:
//! - An in-memory graph model of people, unions and their connections
//! - Connection rules that keep every diagram a structurally valid tree
//! - Automatic year-ordered, port-routed layout of generation clusters
//! - Real-time synchronization between concurrently connected editors
//! - A REST persistence gateway mirroring mutations to the durable store

pub mod cluster;
pub mod gateway;
pub mod layout;
pub mod model;
pub mod rules;
pub mod session;
pub mod sync;

use std::path::Path;

use serde::Deserialize;

use layout::LayoutConfig;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Durable store connection section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the CRUD REST API.
    pub base_url: String,
    /// Request timeout for every store call, in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000/api".into(),
            timeout_secs: 10,
        }
    }
}

/// Collaboration transport section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Broadcast channel capacity; a slow client past this lags and skips.
    pub capacity: usize,
    /// Drag position broadcast window, in milliseconds.
    pub position_throttle_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            position_throttle_ms: 80,
        }
    }
}

/// Top-level configuration.
///
/// Loaded from a YAML file with env var overrides; priority is
/// env var > YAML > default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub layout: LayoutConfig,
}

impl CanvasConfig {
    /// Load configuration from environment variables only.
    /// Equivalent to `from_yaml_and_env(None)`.
    pub fn from_env() -> Self {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with
    /// env vars.
    ///
    /// If `yaml_path` is None, tries "canvas.yaml" in CWD. A missing or
    /// malformed file falls back to defaults (with a warning for the
    /// malformed case).
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Self {
        let mut config = Self::load_yaml(yaml_path);

        if let Ok(url) = std::env::var("KINSHIP_API_URL") {
            config.api.base_url = url;
        }
        if let Some(timeout) = env_parse("KINSHIP_API_TIMEOUT_SECS") {
            config.api.timeout_secs = timeout;
        }
        if let Some(capacity) = env_parse("KINSHIP_SYNC_CAPACITY") {
            config.sync.capacity = capacity;
        }
        if let Some(window) = env_parse("KINSHIP_POSITION_THROTTLE_MS") {
            config.sync.position_throttle_ms = window;
        }
        config
    }

    /// Try to load and parse a YAML config file. Returns defaults on any
    /// failure.
    fn load_yaml(yaml_path: Option<&Path>) -> Self {
        let default_path = Path::new("canvas.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Build the REST gateway this config points at.
    pub fn rest_gateway(&self) -> anyhow::Result<gateway::RestGateway> {
        gateway::RestGateway::new(&self.api.base_url, self.api.timeout_secs)
    }

    /// Build a sync hub with the configured capacity.
    pub fn sync_hub(&self) -> sync::SyncHub {
        sync::SyncHub::new(self.sync.capacity)
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|s| s.parse().ok())
}

// ============================================================================
// Tests
// ============================================================================
