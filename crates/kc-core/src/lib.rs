//! Core domain types for the KuCoin ticker client.
//!
//! This crate provides the types shared by the feed decoder and the
//! WebSocket client:
//! - `TradingMode`: Spot vs. Futures (REST host, topic prefix, price shape)
//! - `RelayCandidate`: One WebSocket instance server from the bootstrap call
//! - `SessionToken`: Single-use bootstrap token
//! - `TickerUpdate`, `Price`: Decoded ticker output

pub mod decimal;
pub mod error;
pub mod types;

pub use decimal::Price;
pub use error::{CoreError, Result};
pub use types::{RelayCandidate, SessionToken, TickerUpdate, TradingMode};
