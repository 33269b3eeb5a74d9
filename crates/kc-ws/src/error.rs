//! WebSocket client error types.
//!
//! Every error maps onto one of three kinds that drive the reconnect loop:
//! transport failures restart the bootstrap, protocol rejections abandon the
//! attempt, and cancellation ends the client.

use crate::connection::ConnectionState;
use std::time::Duration;
use thiserror::Error;

/// How the reconnect loop treats an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Resolve/connect/handshake/read/write failure or peer close. Retried.
    Transport,
    /// Bootstrap rejection or unusable relay data. Not retried by default.
    Protocol,
    /// Shutdown was requested.
    Cancelled,
}

#[derive(Debug, Error)]
pub enum WsError {
    #[error("DNS resolution failed for {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No address resolved for {0}")]
    NoAddress(String),

    #[error("Connect failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Stage {state} timed out after {after:?}")]
    Timeout {
        state: ConnectionState,
        after: Duration,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("Tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Connection closed: code={code}, reason={reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("Keep-alive timeout: no frame for {0:?}")]
    KeepAliveTimeout(Duration),

    #[error("Bootstrap rejected: {0}")]
    Rejected(String),

    #[error("Malformed bootstrap response: {0}")]
    MalformedBootstrap(String),

    #[error("No relay candidate supports encryption")]
    NoEncryptedRelay,

    #[error("Invalid relay endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Client is already running")]
    AlreadyRunning,

    #[error("Shutdown requested")]
    Cancelled,
}

impl WsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Resolve { .. }
            | Self::NoAddress(_)
            | Self::Connect(_)
            | Self::Tls(_)
            | Self::Timeout { .. }
            | Self::Http(_)
            | Self::Tungstenite(_)
            | Self::ConnectionClosed { .. }
            | Self::KeepAliveTimeout(_) => ErrorKind::Transport,
            Self::Rejected(_)
            | Self::MalformedBootstrap(_)
            | Self::NoEncryptedRelay
            | Self::InvalidEndpoint(_)
            | Self::AlreadyRunning => ErrorKind::Protocol,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

pub type WsResult<T> = Result<T, WsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            WsError::ConnectionClosed {
                code: 1000,
                reason: String::new()
            }
            .kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            WsError::Timeout {
                state: ConnectionState::ConnectingRest,
                after: Duration::from_secs(30)
            }
            .kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            WsError::Rejected("400100".into()).kind(),
            ErrorKind::Protocol
        );
        assert_eq!(WsError::NoEncryptedRelay.kind(), ErrorKind::Protocol);
        assert_eq!(WsError::Cancelled.kind(), ErrorKind::Cancelled);
    }
}
