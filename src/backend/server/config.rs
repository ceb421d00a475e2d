/**
 * Server Configuration
 *
 * This module loads the server configuration: where to listen, how to reach
 * the collaborators, and the hub's timing and size limits.
 *
 * # Configuration Sources
 *
 * Later sources override earlier ones:
 * 1. Built-in defaults (`HubConfig::default()`, port 3000)
 * 2. Optional TOML file named by `CHATHUB_CONFIG`
 * 3. Environment variables (`.env` is loaded by the binary)
 *
 * # Environment Variables
 *
 * - `SERVER_PORT`
 * - `DATABASE_URL` - SQLite URL; in-memory store when unset
 * - `JWT_SECRET` - required, shared with the token issuer
 * - `CHAT_DIRECTORY_URL` - REST membership lookup base URL
 * - `CHAT_DIRECTORY_TOKEN` - optional bearer token for that lookup
 * - `MAX_MESSAGE_LENGTH`, `HANDSHAKE_TIMEOUT_SECS`, `KEEP_ALIVE_SECS`,
 *   `CLIENT_TIMEOUT_SECS`, `OUTBOUND_CAPACITY`
 */

use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use crate::shared::config::HubConfigFile;
use crate::shared::{ConfigError, HubConfig};

pub const DEFAULT_PORT: u16 = 3000;

/// Everything the binary needs to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub chat_directory_url: Option<String>,
    pub chat_directory_token: Option<String>,
    pub hub: HubConfig,
}

/// On-disk form of [`ServerConfig`]
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerConfigFile {
    port: Option<u16>,
    database_url: Option<String>,
    jwt_secret: Option<String>,
    chat_directory_url: Option<String>,
    chat_directory_token: Option<String>,
    #[serde(default)]
    hub: HubConfigFile,
}

impl ServerConfig {
    /// Load from `CHATHUB_CONFIG` and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = match std::env::var("CHATHUB_CONFIG") {
            Ok(path) => {
                tracing::info!("Reading configuration from {}", path);
                Some(std::fs::read_to_string(&path).map_err(|e| {
                    ConfigError::Parse(format!("cannot read {}: {}", path, e))
                })?)
            }
            Err(_) => None,
        };
        Self::from_sources(file.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build from an optional TOML document and a variable lookup.
    ///
    /// Kept separate from [`ServerConfig::from_env`] so tests never touch the
    /// real environment.
    pub fn from_sources<F>(toml_source: Option<&str>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: ServerConfigFile = match toml_source {
            Some(source) => toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?,
            None => ServerConfigFile::default(),
        };

        let mut hub = file.hub.apply(HubConfig::builder());
        if let Some(length) = parse_var::<usize, _>(&lookup, "MAX_MESSAGE_LENGTH")? {
            hub = hub.max_message_length(length);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "HANDSHAKE_TIMEOUT_SECS")? {
            hub = hub.handshake_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "KEEP_ALIVE_SECS")? {
            hub = hub.keep_alive_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "CLIENT_TIMEOUT_SECS")? {
            hub = hub.client_timeout(Duration::from_secs(secs));
        }
        if let Some(capacity) = parse_var::<usize, _>(&lookup, "OUTBOUND_CAPACITY")? {
            hub = hub.outbound_capacity(capacity);
        }

        let jwt_secret = lookup("JWT_SECRET")
            .or(file.jwt_secret)
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::MissingValue("JWT_SECRET"))?;

        Ok(Self {
            port: parse_var(&lookup, "SERVER_PORT")?
                .or(file.port)
                .unwrap_or(DEFAULT_PORT),
            database_url: lookup("DATABASE_URL").or(file.database_url),
            jwt_secret,
            chat_directory_url: lookup("CHAT_DIRECTORY_URL").or(file.chat_directory_url),
            chat_directory_token: lookup("CHAT_DIRECTORY_TOKEN").or(file.chat_directory_token),
            hub: hub.build()?,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key,
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}
