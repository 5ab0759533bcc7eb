//! Agent configuration
//!
//! A fixed set of options read once at boot. A TOML file may override any
//! subset of the defaults.

use crate::connection::Backoff;
use anyhow::{Context, Result};
use rover_shared::link;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// Configuration problems detected at boot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Unsupported endpoint scheme `{0}` (expected ws or wss)")]
    UnsupportedScheme(String),

    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),

    #[error("`{0}.max_delay_ms` must not be below `{0}.initial_delay_ms`")]
    InvertedDelays(&'static str),
}

/// Network credentials handed to the association subsystem
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub ssid: String,
    pub passphrase: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("ssid", &self.ssid)
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Exponential retry timing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: link::RETRY_DELAY_MS,
            max_delay_ms: link::MAX_RETRY_DELAY_MS,
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }

    fn validate(&self, section: &'static str) -> Result<(), ConfigError> {
        if self.initial_delay_ms == 0 {
            return Err(ConfigError::Zero(section));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(ConfigError::InvertedDelays(section));
        }
        Ok(())
    }
}

/// Reconnection after the link closes
///
/// Disabled by default: a closed link stays down until restart.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub enabled: bool,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            enabled: false,
            initial_delay_ms: retry.initial_delay_ms,
            max_delay_ms: retry.max_delay_ms,
        }
    }
}

impl ReconnectConfig {
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            initial_delay_ms: self.initial_delay_ms,
            max_delay_ms: self.max_delay_ms,
        }
    }
}

/// Configuration for the agent
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Controller address (`ws://` or `wss://`)
    pub endpoint: String,
    /// Identification sent to the controller after each open
    pub device_id: Option<String>,
    pub credentials: Credentials,
    /// Probe period while connected
    pub keepalive_interval_ms: u64,
    /// Pause between loop iterations
    pub poll_interval_ms: u64,
    pub connect_timeout_ms: u64,
    pub max_events_per_poll: usize,
    /// Retry timing for network association
    pub association: RetryConfig,
    pub reconnect: ReconnectConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8080".into(),
            device_id: None,
            credentials: Credentials::default(),
            keepalive_interval_ms: link::KEEPALIVE_INTERVAL_MS,
            poll_interval_ms: link::POLL_INTERVAL_MS,
            connect_timeout_ms: link::CONNECT_TIMEOUT_MS,
            max_events_per_poll: link::MAX_EVENTS_PER_POLL,
            association: RetryConfig::default(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Load from `path` if it exists, otherwise use defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(config_path = %path.display(), "Config file not found, using defaults");
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }

        info!(config_path = %path.display(), "Loading configuration");
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("failed to load {}", path.display()))
    }

    /// Parse a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("invalid TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.into())),
        }
        if url.host_str().is_none() {
            return Err(ConfigError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: "missing host".into(),
            });
        }

        if self.keepalive_interval_ms == 0 {
            return Err(ConfigError::Zero("keepalive_interval_ms"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Zero("poll_interval_ms"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Zero("connect_timeout_ms"));
        }
        if self.max_events_per_poll == 0 {
            return Err(ConfigError::Zero("max_events_per_poll"));
        }

        self.association.validate("association")?;
        if self.reconnect.enabled {
            self.reconnect.retry().validate("reconnect")?;
        }
        Ok(())
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.keepalive_interval(), Duration::from_secs(15));
        assert!(!config.reconnect.enabled);
        assert!(config.device_id.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AgentConfig::from_toml_str(
            r#"
            endpoint = "wss://controller.example.com/ws"
            device_id = "rover-42"

            [credentials]
            ssid = "lab"
            passphrase = "hunter2"

            [reconnect]
            enabled = true
            initial_delay_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoint, "wss://controller.example.com/ws");
        assert_eq!(config.device_id.as_deref(), Some("rover-42"));
        assert_eq!(config.credentials.ssid, "lab");
        assert_eq!(config.keepalive_interval_ms, link::KEEPALIVE_INTERVAL_MS);
        assert_eq!(config.max_events_per_poll, link::MAX_EVENTS_PER_POLL);
        assert!(config.reconnect.enabled);

        let retry = config.reconnect.retry();
        assert_eq!(retry.initial_delay_ms, 500);
        assert_eq!(retry.max_delay_ms, link::MAX_RETRY_DELAY_MS);
    }

    #[test]
    fn test_rejects_bad_endpoints() {
        let mut config = AgentConfig::default();

        config.endpoint = "http://127.0.0.1:8080".into();
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnsupportedScheme("http".into()))
        );

        config.endpoint = "127.0.0.1:8080".into();
        assert!(config.validate().is_err());

        config.endpoint = "not a url".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_values() {
        let mut config = AgentConfig::default();
        config.keepalive_interval_ms = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero("keepalive_interval_ms"))
        );

        let mut config = AgentConfig::default();
        config.max_events_per_poll = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero("max_events_per_poll"))
        );
    }

    #[test]
    fn test_rejects_inverted_delays() {
        let result = AgentConfig::from_toml_str(
            r#"
            [association]
            initial_delay_ms = 5000
            max_delay_ms = 1000
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unknown_types() {
        assert!(AgentConfig::from_toml_str("keepalive_interval_ms = \"soon\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "keepalive_interval_ms = 5000").unwrap();
        writeln!(file, "poll_interval_ms = 20").unwrap();

        let config = AgentConfig::load(file.path()).unwrap();
        assert_eq!(config.keepalive_interval(), Duration::from_secs(5));
        assert_eq!(config.poll_interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "endpoint = \"http://127.0.0.1:8080\"").unwrap();

        let err = AgentConfig::load(file.path()).unwrap_err();
        assert_eq!(
            err.root_cause().downcast_ref::<ConfigError>(),
            Some(&ConfigError::UnsupportedScheme("http".into()))
        );
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.endpoint, AgentConfig::default().endpoint);
    }

    #[test]
    fn test_debug_redacts_passphrase() {
        let credentials = Credentials {
            ssid: "lab".into(),
            passphrase: "hunter2".into(),
        };
        let printed = format!("{credentials:?}");
        assert!(printed.contains("lab"));
        assert!(!printed.contains("hunter2"));
    }
}
