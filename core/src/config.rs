//! Configuration loading for contexts and their connections.
//!
//! Stores configuration in YAML format at `~/.config/.kpf`.
//! Keys are camelCase; the PascalCase spelling of older files is accepted too.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tokio::fs;

use crate::domain::{ClusterContext, Connection, ContextSet, Target};
use crate::error::{Error, Result};

/// Default context polling interval in seconds.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Raw configuration document as written on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Context polling interval in seconds.
    #[serde(default = "default_poll_interval", alias = "PollInterval")]
    pub poll_interval: u64,

    /// Restart backoff. Without it failed tunnels restart immediately, forever.
    #[serde(default, alias = "Restart")]
    pub restart: Option<RestartSettings>,

    #[serde(default, alias = "Contexts")]
    pub contexts: Vec<ContextEntry>,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

/// Backoff settings for failed tunnels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartSettings {
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Consecutive failures after which a connection is left stopped.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RestartSettings {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
            max_attempts: None,
        }
    }
}

/// One context entry on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextEntry {
    #[serde(alias = "Name")]
    pub name: String,

    #[serde(default, alias = "Connections")]
    pub connections: Vec<ConnectionEntry>,
}

/// One connection entry on disk. Exactly one of `service_name`/`pod_name` is set.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEntry {
    /// Also read from `serviceIdentity`, which names a service.
    #[serde(default, alias = "serviceIdentity", alias = "ServiceName")]
    pub service_name: Option<String>,

    #[serde(default, alias = "PodName")]
    pub pod_name: Option<String>,

    #[serde(alias = "Namespace")]
    pub namespace: String,

    #[serde(alias = "LocalPort")]
    pub local_port: u16,

    #[serde(alias = "RemoteServicePort")]
    pub remote_service_port: u16,

    #[serde(default, alias = "RemotePodPort")]
    pub remote_pod_port: Option<u16>,
}

impl TryFrom<&ConnectionEntry> for Connection {
    type Error = String;

    fn try_from(entry: &ConnectionEntry) -> std::result::Result<Self, Self::Error> {
        let target = match (non_empty(&entry.service_name), non_empty(&entry.pod_name)) {
            (Some(service), None) => Target::Service(service.to_string()),
            (None, Some(pod)) => Target::Pod(pod.to_string()),
            (Some(_), Some(_)) => {
                return Err("both serviceName and podName are set".to_string());
            }
            (None, None) => return Err("both serviceName and podName are empty".to_string()),
        };

        if entry.namespace.trim().is_empty() {
            return Err(format!("{} has an empty namespace", target.name()));
        }
        if entry.local_port == 0
            || entry.remote_service_port == 0
            || entry.remote_pod_port == Some(0)
        {
            return Err(format!("{} uses port 0", target.name()));
        }

        Ok(Connection {
            target,
            namespace: entry.namespace.clone(),
            local_port: entry.local_port,
            remote_service_port: entry.remote_service_port,
            remote_pod_port: entry.remote_pod_port,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub poll_interval: Duration,
    pub restart: Option<RestartSettings>,
    pub contexts: ContextSet,
}

impl Config {
    /// Parses and validates a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(content)?;
        Self::try_from(file)
    }
}

impl TryFrom<ConfigFile> for Config {
    type Error = Error;

    fn try_from(file: ConfigFile) -> Result<Self> {
        if file.poll_interval == 0 {
            return Err(Error::Config("pollInterval must be at least 1 second".to_string()));
        }
        if let Some(restart) = &file.restart {
            if restart.multiplier < 1.0 || restart.initial_backoff_ms > restart.max_backoff_ms {
                return Err(Error::Config(
                    "restart needs multiplier >= 1 and initialBackoffMs <= maxBackoffMs"
                        .to_string(),
                ));
            }
        }

        let mut names = HashSet::new();
        let mut contexts = Vec::with_capacity(file.contexts.len());

        for entry in &file.contexts {
            if entry.name.trim().is_empty() {
                return Err(Error::Config("context with an empty name".to_string()));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(Error::Config(format!("duplicate context '{}'", entry.name)));
            }
            contexts.push(validate_context(entry)?);
        }

        Ok(Self {
            poll_interval: Duration::from_secs(file.poll_interval),
            restart: file.restart,
            contexts: ContextSet::new(contexts),
        })
    }
}

fn validate_context(entry: &ContextEntry) -> Result<ClusterContext> {
    let mut identities = HashSet::new();
    let mut local_ports = HashSet::new();
    let mut connections = Vec::with_capacity(entry.connections.len());

    for raw in &entry.connections {
        let connection = Connection::try_from(raw)
            .map_err(|e| Error::Config(format!("context '{}': {}", entry.name, e)))?;

        if !identities.insert(connection.identity()) {
            return Err(Error::Config(format!(
                "context '{}': {} is listed twice",
                entry.name,
                connection.identity()
            )));
        }
        if !local_ports.insert(connection.local_port) {
            return Err(Error::Config(format!(
                "context '{}': local port {} is used twice",
                entry.name, connection.local_port
            )));
        }
        connections.push(connection);
    }

    Ok(ClusterContext::new(entry.name.clone(), connections))
}

/// Configuration store for the contexts file.
///
/// Handles reading configuration from `~/.config/.kpf`.
pub struct ConfigStore {
    /// Path to the configuration file.
    config_path: PathBuf,
}

impl ConfigStore {
    /// Create a new config store with the default path.
    ///
    /// Default path: `~/.config/.kpf`
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

        Ok(Self {
            config_path: home.join(".config").join(".kpf"),
        })
    }

    /// Create a config store with a custom path.
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load and validate configuration from disk.
    ///
    /// A missing file is an error: there is nothing to forward without it.
    pub async fn load(&self) -> Result<Config> {
        let content = fs::read_to_string(&self.config_path).await.map_err(|e| {
            Error::Config(format!(
                "Failed to read config {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        Config::from_yaml(&content)
    }
}
