//! Ticker frame decoding for the KuCoin ticker client.
//!
//! Turns raw WebSocket frames into `TickerUpdate` values. Frames that are not
//! ticker updates (welcome/ack messages, other topics) decode to nothing.

pub mod decoder;
pub mod error;

pub use decoder::{decode_ticker, try_decode_ticker, TickerDecoder};
pub use error::{FeedError, FeedResult};
