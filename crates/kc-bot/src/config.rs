//! Application configuration.

use crate::error::{AppError, AppResult};
use kc_core::TradingMode;
use kc_ws::{BootstrapEndpoint, ClientConfig, StageTimeouts};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Bootstrap endpoint overrides. Unset fields follow the trading mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// REST host. Defaults to the mode's public API host.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Plain HTTP when false. Only meant for local testing.
    #[serde(default = "default_tls")]
    pub tls: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_port() -> u16 {
    443
}

fn default_tls() -> bool {
    true
}

fn default_user_agent() -> String {
    kc_ws::config::DEFAULT_USER_AGENT.to_string()
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_port(),
            tls: default_tls(),
            user_agent: default_user_agent(),
        }
    }
}

/// Per-stage deadlines in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_rest_connect_ms")]
    pub rest_connect_ms: u64,
    #[serde(default = "default_rest_tls_ms")]
    pub rest_tls_ms: u64,
    #[serde(default = "default_rest_write_ms")]
    pub rest_write_ms: u64,
    #[serde(default = "default_rest_read_ms")]
    pub rest_read_ms: u64,
    #[serde(default = "default_ws_connect_ms")]
    pub ws_connect_ms: u64,
    #[serde(default = "default_ws_tls_ms")]
    pub ws_tls_ms: u64,
}

fn default_rest_connect_ms() -> u64 {
    30_000
}

fn default_rest_tls_ms() -> u64 {
    15_000
}

fn default_rest_write_ms() -> u64 {
    10_000
}

fn default_rest_read_ms() -> u64 {
    20_000
}

fn default_ws_connect_ms() -> u64 {
    30_000
}

fn default_ws_tls_ms() -> u64 {
    10_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            rest_connect_ms: default_rest_connect_ms(),
            rest_tls_ms: default_rest_tls_ms(),
            rest_write_ms: default_rest_write_ms(),
            rest_read_ms: default_rest_read_ms(),
            ws_connect_ms: default_ws_connect_ms(),
            ws_tls_ms: default_ws_tls_ms(),
        }
    }
}

impl From<&TimeoutConfig> for StageTimeouts {
    fn from(cfg: &TimeoutConfig) -> Self {
        Self {
            rest_connect: Duration::from_millis(cfg.rest_connect_ms),
            rest_tls: Duration::from_millis(cfg.rest_tls_ms),
            rest_write: Duration::from_millis(cfg.rest_write_ms),
            rest_read: Duration::from_millis(cfg.rest_read_ms),
            ws_connect: Duration::from_millis(cfg.ws_connect_ms),
            ws_tls: Duration::from_millis(cfg.ws_tls_ms),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Spot or futures market.
    #[serde(default)]
    pub mode: TradingMode,
    /// Symbols to subscribe to, in order (e.g., "BTC-USDT", "XBTUSDTM").
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Keep restarting after the bootstrap is rejected.
    #[serde(default)]
    pub retry_on_rejection: bool,
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.symbols.is_empty() {
            return Err(AppError::Config("at least one symbol is required".to_string()));
        }
        if let Some(symbol) = self
            .symbols
            .iter()
            .find(|s| s.is_empty() || s.contains(','))
        {
            return Err(AppError::Config(format!("invalid symbol {symbol:?}")));
        }
        Ok(())
    }

    /// Client configuration for the connection manager.
    pub fn client_config(&self) -> ClientConfig {
        let mut bootstrap = BootstrapEndpoint::for_mode(self.mode);
        if let Some(host) = &self.bootstrap.host {
            bootstrap.host = host.clone();
        }
        bootstrap.port = self.bootstrap.port;
        bootstrap.tls = self.bootstrap.tls;
        bootstrap.user_agent = self.bootstrap.user_agent.clone();

        ClientConfig {
            mode: self.mode,
            bootstrap,
            timeouts: StageTimeouts::from(&self.timeouts),
            retry_on_rejection: self.retry_on_rejection,
        }
    }
}
