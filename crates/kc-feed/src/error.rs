//! Feed error types.

use thiserror::Error;

/// Reasons a frame did not decode into a ticker update.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Frame is not a JSON object: {0}")]
    NotJson(String),

    #[error("Missing or non-string topic")]
    MissingTopic,

    #[error("Topic does not carry ticker prefix: {0}")]
    TopicMismatch(String),

    #[error("Missing data object")]
    MissingData,

    #[error("Missing price field")]
    MissingPrice,

    #[error("Unexpected price type: expected {expected}")]
    PriceType { expected: &'static str },

    #[error("Invalid price: {0}")]
    InvalidPrice(#[from] kc_core::CoreError),
}

pub type FeedResult<T> = Result<T, FeedError>;
