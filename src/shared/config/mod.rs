//! Hub configuration module
//!
//! Tunables shared by the hub and anything that embeds it. Values can be set
//! through [`HubConfigBuilder`] or parsed from a TOML document whose keys
//! mirror the builder methods (durations in whole seconds):
//!
//! ```toml
//! max_message_length = 5000
//! handshake_timeout_secs = 15
//! keep_alive_secs = 15
//! client_timeout_secs = 30
//! outbound_capacity = 256
//! ```

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Default maximum message length in characters
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 5000;
/// Default time allowed for the authentication handshake
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);
/// Default interval between server heartbeats
pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);
/// Default silence after which a connection is dropped
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default per-connection outbound queue size
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Realtime hub configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Maximum message length in characters
    pub max_message_length: usize,
    /// Bound on the authentication handshake
    pub handshake_timeout: Duration,
    /// Interval between server `ping` frames
    pub keep_alive_interval: Duration,
    /// Silence after which the connection is considered dead
    pub client_timeout: Duration,
    /// Per-connection outbound mailbox size
    pub outbound_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
            client_timeout: DEFAULT_CLIENT_TIMEOUT,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

impl HubConfig {
    /// Create a new HubConfigBuilder seeded with defaults
    pub fn builder() -> HubConfigBuilder {
        HubConfigBuilder::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: HubConfigFile =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        file.apply(Self::builder()).build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_length == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_message_length",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.outbound_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "outbound_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.handshake_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "handshake_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.keep_alive_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "keep_alive_interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.client_timeout <= self.keep_alive_interval {
            return Err(ConfigError::InvalidValue {
                key: "client_timeout",
                reason: "must be longer than keep_alive_interval".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for HubConfig
#[derive(Debug, Default)]
pub struct HubConfigBuilder {
    config: HubConfig,
}

impl HubConfigBuilder {
    pub fn max_message_length(mut self, length: usize) -> Self {
        self.config.max_message_length = length;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    pub fn keep_alive_interval(mut self, interval: Duration) -> Self {
        self.config.keep_alive_interval = interval;
        self
    }

    pub fn client_timeout(mut self, timeout: Duration) -> Self {
        self.config.client_timeout = timeout;
        self
    }

    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.config.outbound_capacity = capacity;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<HubConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// On-disk representation; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubConfigFile {
    pub max_message_length: Option<usize>,
    pub handshake_timeout_secs: Option<u64>,
    pub keep_alive_secs: Option<u64>,
    pub client_timeout_secs: Option<u64>,
    pub outbound_capacity: Option<usize>,
}

impl HubConfigFile {
    /// Overlay the keys present in the file onto a builder
    pub fn apply(self, mut builder: HubConfigBuilder) -> HubConfigBuilder {
        if let Some(length) = self.max_message_length {
            builder = builder.max_message_length(length);
        }
        if let Some(secs) = self.handshake_timeout_secs {
            builder = builder.handshake_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.keep_alive_secs {
            builder = builder.keep_alive_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = self.client_timeout_secs {
            builder = builder.client_timeout(Duration::from_secs(secs));
        }
        if let Some(capacity) = self.outbound_capacity {
            builder = builder.outbound_capacity(capacity);
        }
        builder
    }
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}
