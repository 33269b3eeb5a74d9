//! Watch list and subscribe message construction.

use kc_core::TradingMode;
use parking_lot::Mutex;
use rand::Rng;
use serde_json::json;
use tracing::debug;

/// Comma-joined list of symbols to subscribe to.
///
/// Order is preserved and duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchList(String);

impl WatchList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, symbol: &str) {
        if !self.0.is_empty() {
            self.0.push(',');
        }
        self.0.push_str(symbol);
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Build the subscribe message for `symbols` (already comma-joined).
///
/// `id` is not correlated with acknowledgements.
pub fn build_subscribe_message(mode: TradingMode, symbols: &str, id: u32) -> String {
    json!({
        "id": id,
        "type": "subscribe",
        "topic": format!("{}{}", mode.topic_prefix(), symbols),
        "response": false,
    })
    .to_string()
}

/// Random request id in `1..=100`.
pub fn random_request_id() -> u32 {
    rand::thread_rng().gen_range(1..=100)
}

/// Watch list plus the subscribe text composed from it.
///
/// Composing clears the watch list; the text is cached and reused by every
/// later session of the same client.
#[derive(Debug)]
pub struct SubscriptionState {
    mode: TradingMode,
    watch_list: Mutex<WatchList>,
    cached: Mutex<Option<String>>,
}

impl SubscriptionState {
    pub fn new(mode: TradingMode) -> Self {
        Self {
            mode,
            watch_list: Mutex::new(WatchList::new()),
            cached: Mutex::new(None),
        }
    }

    pub fn add(&self, symbol: &str) {
        self.watch_list.lock().add(symbol);
    }

    /// Current (not yet composed) watch list.
    pub fn watch_list(&self) -> String {
        self.watch_list.lock().as_str().to_string()
    }

    /// Subscribe text for the next session.
    pub fn subscribe_message(&self) -> String {
        let mut cached = self.cached.lock();
        if let Some(text) = cached.as_ref() {
            return text.clone();
        }

        let mut watch_list = self.watch_list.lock();
        let text = build_subscribe_message(self.mode, watch_list.as_str(), random_request_id());
        watch_list.clear();
        debug!(%text, "Composed subscribe message");

        *cached = Some(text.clone());
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_watch_list_joins_in_order() {
        let mut list = WatchList::new();
        assert!(list.is_empty());
        list.add("A");
        list.add("B");
        assert_eq!(list.as_str(), "A,B");
        list.add("A");
        assert_eq!(list.as_str(), "A,B,A");
        list.clear();
        assert!(list.is_empty());
    }

    #[test]
    fn test_spot_subscribe_message() {
        let text = build_subscribe_message(TradingMode::Spot, "BTC-USDT,RUNE-USDT", 42);
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["topic"], "/market/ticker:BTC-USDT,RUNE-USDT");
        assert_eq!(value["type"], "subscribe");
        assert_eq!(value["response"], false);
        assert_eq!(value["id"], 42);
    }

    #[test]
    fn test_futures_subscribe_message() {
        let text = build_subscribe_message(TradingMode::Futures, "XBTUSDTM", 1);
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["topic"], "/contractMarket/ticker:XBTUSDTM");
    }

    #[test]
    fn test_request_id_range() {
        for _ in 0..500 {
            let id = random_request_id();
            assert!((1..=100).contains(&id));
        }
    }

    #[test]
    fn test_subscribe_message_clears_watch_list_and_caches() {
        let state = SubscriptionState::new(TradingMode::Spot);
        state.add("BTC-USDT");
        state.add("RUNE-USDT");
        assert_eq!(state.watch_list(), "BTC-USDT,RUNE-USDT");

        let first = state.subscribe_message();
        assert_eq!(state.watch_list(), "");

        let value: Value = serde_json::from_str(&first).unwrap();
        assert_eq!(value["topic"], "/market/ticker:BTC-USDT,RUNE-USDT");
        let id = value["id"].as_u64().unwrap();
        assert!((1..=100).contains(&id));

        // Reconnects reuse the same text
        assert_eq!(state.subscribe_message(), first);
    }
}
