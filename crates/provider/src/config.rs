//! Provider configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backoff::Backoff;
use crate::retry::RetryPolicy;
use crate::schema::TimeoutDefaults;

/// Provider configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Remote API endpoint
    pub endpoint: Option<String>,

    /// Region the provider operates in
    pub region: String,

    /// Operation deadlines overriding each resource's defaults
    pub timeouts: TimeoutConfig,

    /// Poll schedule used while waiting for convergence
    pub waiter: Backoff,

    /// Retry budgets for mutating calls
    pub retry: RetryConfig,

    /// In-memory API used by the CLI and tests
    pub simulator: SimulatorConfig,
}

/// Per-operation wait deadlines, in seconds. Unset values fall back to
/// the resource schema's defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_secs: Option<u64>,
}

/// Deadlines in effect for one resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl TimeoutConfig {
    pub fn resolve(&self, defaults: TimeoutDefaults) -> Timeouts {
        Timeouts {
            create: Duration::from_secs(self.create_secs.unwrap_or(defaults.create)),
            update: Duration::from_secs(self.update_secs.unwrap_or(defaults.update)),
            delete: Duration::from_secs(self.delete_secs.unwrap_or(defaults.delete)),
        }
    }
}

/// Retry budgets for mutating calls rejected while another operation runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Budget for update requests
    pub update: RetryPolicy,

    /// Budget for delete requests
    pub delete: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            update: RetryPolicy::default().with_budget(Duration::from_secs(20 * 60)),
            delete: RetryPolicy::default().with_budget(Duration::from_secs(10 * 60)),
        }
    }
}

/// Simulated API behaviour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Polls an in-progress entity takes to settle
    pub settle_polls: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self { settle_polls: 3 }
    }
}

impl ProviderConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default configuration file location
    pub fn default_path() -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cirrus")
            .join("config.toml")
    }
}
