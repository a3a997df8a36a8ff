use crate::account::DEFAULT_MAX_ACCOUNTS;
use crate::error::{PhantomError, Result};
use crate::network::{LoopSettings, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_CLIENTS, DEFAULT_MAX_OUTBOUND};
use log::info;
use serde::Deserialize;
use std::env;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8888;
const DEFAULT_POLL_TIMEOUT_MS: u64 = 500;

const PORT_KEY: &str = "PHANTOMID_PORT";
const MAX_CLIENTS_KEY: &str = "PHANTOMID_MAX_CLIENTS";
const MAX_ACCOUNTS_KEY: &str = "PHANTOMID_MAX_ACCOUNTS";

/// Daemon settings
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub port: u16,
    pub max_accounts: usize,
    pub max_clients: usize,
    pub buffer_size: usize,
    pub poll_timeout_ms: u64,
    /// Unsent reply bytes a client may leave queued before it is dropped
    pub max_outbound_bytes: usize,
    /// Accounts created right after startup and logged
    pub initial_accounts: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: DEFAULT_PORT,
            max_accounts: DEFAULT_MAX_ACCOUNTS,
            max_clients: DEFAULT_MAX_CLIENTS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            max_outbound_bytes: DEFAULT_MAX_OUTBOUND,
            initial_accounts: 0,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config> {
        let raw = fs::read_to_string(path).map_err(|e| {
            PhantomError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: Config = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Defaults, then the optional file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Config::from_file(path)?
            }
            None => Config::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PHANTOMID_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(PORT_KEY) {
            self.port = parse_value(PORT_KEY, &port)?;
        }
        if let Some(max_clients) = lookup(MAX_CLIENTS_KEY) {
            self.max_clients = parse_value(MAX_CLIENTS_KEY, &max_clients)?;
        }
        if let Some(max_accounts) = lookup(MAX_ACCOUNTS_KEY) {
            self.max_accounts = parse_value(MAX_ACCOUNTS_KEY, &max_accounts)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_accounts == 0 {
            return Err(PhantomError::Config(
                "max_accounts must be at least 1".to_string(),
            ));
        }
        if self.max_clients == 0 {
            return Err(PhantomError::Config(
                "max_clients must be at least 1".to_string(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(PhantomError::Config(
                "buffer_size must be at least 1".to_string(),
            ));
        }
        if self.poll_timeout_ms == 0 {
            return Err(PhantomError::Config(
                "poll_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.max_outbound_bytes < self.buffer_size {
            return Err(PhantomError::Config(format!(
                "max_outbound_bytes ({}) is smaller than buffer_size ({})",
                self.max_outbound_bytes, self.buffer_size
            )));
        }
        if self.initial_accounts > self.max_accounts {
            return Err(PhantomError::Config(format!(
                "initial_accounts ({}) exceeds max_accounts ({})",
                self.initial_accounts, self.max_accounts
            )));
        }
        Ok(())
    }

    /// The daemon always listens on every interface.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            max_clients: self.max_clients,
            buffer_size: self.buffer_size,
            poll_timeout: self.poll_timeout(),
            max_outbound: self.max_outbound_bytes,
            ..LoopSettings::default()
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| PhantomError::Config(format!("Invalid value for {key}: {value} ({e})")))
}
