//! Client configuration.

use kc_core::TradingMode;
use std::time::Duration;

/// Fixed REST path returning a public WebSocket token and relay list.
pub const BULLET_PUBLIC_PATH: &str = "/api/v1/bullet-public";
/// User agent sent with the bootstrap request.
pub const DEFAULT_USER_AGENT: &str = "postman";

/// Where the bootstrap request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapEndpoint {
    /// REST host, also used as TLS SNI and `Host` header.
    pub host: String,
    pub port: u16,
    /// Plain HTTP when false (local testing only).
    pub tls: bool,
    pub user_agent: String,
}

impl BootstrapEndpoint {
    pub fn for_mode(mode: TradingMode) -> Self {
        Self {
            host: mode.rest_host().to_string(),
            port: 443,
            tls: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Per-stage deadlines applied before the stream is established.
///
/// DNS resolution has no deadline of its own. Once streaming, liveness is
/// left to the keep-alive policy negotiated from relay metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
    pub rest_connect: Duration,
    pub rest_tls: Duration,
    /// Request dispatch, up to the response head.
    pub rest_write: Duration,
    /// Response body.
    pub rest_read: Duration,
    pub ws_connect: Duration,
    pub ws_tls: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            rest_connect: Duration::from_secs(30),
            rest_tls: Duration::from_secs(15),
            rest_write: Duration::from_secs(10),
            rest_read: Duration::from_secs(20),
            ws_connect: Duration::from_secs(30),
            ws_tls: Duration::from_secs(10),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub mode: TradingMode,
    pub bootstrap: BootstrapEndpoint,
    pub timeouts: StageTimeouts,
    /// Restart the bootstrap after an application-level rejection too.
    /// Off by default: a rejection ends the client.
    pub retry_on_rejection: bool,
}

impl ClientConfig {
    pub fn for_mode(mode: TradingMode) -> Self {
        Self {
            mode,
            bootstrap: BootstrapEndpoint::for_mode(mode),
            timeouts: StageTimeouts::default(),
            retry_on_rejection: false,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_mode(TradingMode::Spot)
    }
}
