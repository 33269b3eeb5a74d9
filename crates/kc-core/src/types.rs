//! Domain types shared by the decoder and the connection manager.

use crate::decimal::Price;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// REST bootstrap host for spot trading.
pub const SPOT_REST_HOST: &str = "api.kucoin.com";
/// REST bootstrap host for futures trading.
pub const FUTURES_REST_HOST: &str = "api-futures.kucoin.com";
/// Ticker topic prefix for spot trading.
pub const SPOT_TICKER_TOPIC: &str = "/market/ticker:";
/// Ticker topic prefix for futures trading.
pub const FUTURES_TICKER_TOPIC: &str = "/contractMarket/ticker:";

/// Trading mode.
///
/// Selects the REST bootstrap host, the ticker topic prefix and the JSON
/// shape of the streamed price (string for spot, number for futures).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    #[default]
    Spot,
    Futures,
}

impl TradingMode {
    /// REST host serving `/api/v1/bullet-public` for this mode.
    pub fn rest_host(&self) -> &'static str {
        match self {
            Self::Spot => SPOT_REST_HOST,
            Self::Futures => FUTURES_REST_HOST,
        }
    }

    /// Ticker topic prefix for this mode.
    pub fn topic_prefix(&self) -> &'static str {
        match self {
            Self::Spot => SPOT_TICKER_TOPIC,
            Self::Futures => FUTURES_TICKER_TOPIC,
        }
    }
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spot => write!(f, "spot"),
            Self::Futures => write!(f, "futures"),
        }
    }
}

impl FromStr for TradingMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spot" => Ok(Self::Spot),
            "futures" => Ok(Self::Futures),
            other => Err(CoreError::InvalidTradingMode(other.to_string())),
        }
    }
}

/// One WebSocket instance server returned by the bootstrap call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayCandidate {
    /// Relay URI (e.g., "wss://ws-api-spot.kucoin.com/").
    pub endpoint: String,
    /// Whether the relay is served over TLS.
    pub encrypted: bool,
    /// Ping cadence advertised by the relay (ms).
    pub ping_interval_ms: u64,
    /// Idle timeout advertised by the relay (ms).
    pub ping_timeout_ms: u64,
}

impl RelayCandidate {
    pub fn new(
        endpoint: impl Into<String>,
        encrypted: bool,
        ping_interval_ms: u64,
        ping_timeout_ms: u64,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            encrypted,
            ping_interval_ms,
            ping_timeout_ms,
        }
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }
}

/// Bootstrap token authorising exactly one stream session.
///
/// The token is bound to the relay session it was issued for and must be
/// fetched again before every reconnect.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken(len={})", self.0.len())
    }
}

/// Decoded ticker update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerUpdate {
    /// Symbol derived from the topic (e.g., "BTC-USDT", "XBTUSDTM").
    pub symbol: String,
    /// Last traded price.
    pub price: Price,
}

impl TickerUpdate {
    pub fn new(symbol: impl Into<String>, price: Price) -> Self {
        Self {
            symbol: symbol.into(),
            price,
        }
    }
}

impl fmt::Display for TickerUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.symbol, self.price)
    }
}
