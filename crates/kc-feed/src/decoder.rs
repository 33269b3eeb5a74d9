//! Ticker frame decoder.
//!
//! Two payload shapes are supported, selected by `TradingMode`:
//! - Spot: `{"topic": "/market/ticker:BTC-USDT", "data": {"price": "50000.5", ...}}`
//! - Futures: `{"topic": "/contractMarket/ticker:XBTUSDTM", "data": {"price": 50000, ...}}`
//!
//! The topic only has to *contain* the mode's prefix, but the symbol is always
//! taken as the topic minus its first `prefix.len()` characters, wherever the
//! prefix actually matched.

use crate::error::{FeedError, FeedResult};
use kc_core::{Price, TickerUpdate, TradingMode};
use serde_json::Value;
use tracing::trace;

/// Decode a raw frame into a ticker update.
///
/// Returns `None` for anything that is not a well-formed ticker frame for
/// `mode`. Pure: the same bytes and mode always give the same result.
pub fn decode_ticker(frame: &[u8], mode: TradingMode) -> Option<TickerUpdate> {
    match try_decode_ticker(frame, mode) {
        Ok(update) => Some(update),
        Err(e) => {
            trace!(%e, "Frame is not a ticker update");
            None
        }
    }
}

/// Decode a raw frame, reporting why it was not a ticker update.
pub fn try_decode_ticker(frame: &[u8], mode: TradingMode) -> FeedResult<TickerUpdate> {
    let value: Value =
        serde_json::from_slice(frame).map_err(|e| FeedError::NotJson(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| FeedError::NotJson("top-level value is not an object".to_string()))?;

    let topic = object
        .get("topic")
        .and_then(Value::as_str)
        .ok_or(FeedError::MissingTopic)?;

    let prefix = mode.topic_prefix();
    if !topic.contains(prefix) {
        return Err(FeedError::TopicMismatch(topic.to_string()));
    }

    let price = object
        .get("data")
        .and_then(Value::as_object)
        .ok_or(FeedError::MissingData)?
        .get("price")
        .ok_or(FeedError::MissingPrice)?;

    let price = match (mode, price) {
        (TradingMode::Spot, Value::String(text)) => text.parse::<Price>()?,
        (TradingMode::Futures, Value::Number(number)) => Price::from_json_number(number)?,
        (TradingMode::Spot, _) => return Err(FeedError::PriceType { expected: "string" }),
        (TradingMode::Futures, _) => return Err(FeedError::PriceType { expected: "number" }),
    };

    let symbol: String = topic.chars().skip(prefix.chars().count()).collect();
    Ok(TickerUpdate::new(symbol, price))
}

/// Decoder bound to one trading mode.
#[derive(Debug, Clone, Copy)]
pub struct TickerDecoder {
    mode: TradingMode,
}

impl TickerDecoder {
    pub fn new(mode: TradingMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> TradingMode {
        self.mode
    }

    pub fn decode(&self, frame: &[u8]) -> Option<TickerUpdate> {
        decode_ticker(frame, self.mode)
    }
}
