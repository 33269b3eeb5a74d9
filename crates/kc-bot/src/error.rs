//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] kc_ws::WsError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] kc_telemetry::TelemetryError),

    #[error("Client task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type AppResult<T> = Result<T, AppError>;
