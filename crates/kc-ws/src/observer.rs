//! Observer hooks for integrators.
//!
//! The client logs everything it does; an observer is only needed to react
//! to events programmatically. Every hook defaults to a no-op.

use crate::connection::ConnectionState;
use crate::error::{ErrorKind, WsError};
use kc_core::TickerUpdate;
use tokio::sync::mpsc;
use tracing::warn;

/// Receives lifecycle, control-frame and data events.
///
/// Hooks run inline on the client task and must not block.
pub trait StreamObserver: Send + Sync {
    fn on_state(&self, _state: ConnectionState) {}

    fn on_ticker(&self, _update: &TickerUpdate) {}

    /// Data frame that did not decode as a ticker.
    fn on_raw_frame(&self, _frame: &[u8]) {}

    fn on_close(&self, _code: u16, _reason: &str) {}

    fn on_ping(&self) {}

    fn on_pong(&self) {}

    /// A bootstrap or stream attempt failed.
    fn on_failure(&self, _error: &WsError) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StreamObserver for NoopObserver {}

/// Event forwarded by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    State(ConnectionState),
    Ticker(TickerUpdate),
    RawFrame(String),
    Closed { code: u16, reason: String },
    Ping,
    Pong,
    Failure { kind: ErrorKind, message: String },
}

/// Forwards events over a bounded channel.
///
/// Events are dropped (with a warning) when the receiver lags.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::Sender<ClientEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::Sender<ClientEvent>) -> Self {
        Self { tx }
    }

    /// Create an observer together with its receiving end.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    fn forward(&self, event: ClientEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(?event, "Event channel full, dropping event");
            }
            // Receiver gone; nobody is listening anymore
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

impl StreamObserver for ChannelObserver {
    fn on_state(&self, state: ConnectionState) {
        self.forward(ClientEvent::State(state));
    }

    fn on_ticker(&self, update: &TickerUpdate) {
        self.forward(ClientEvent::Ticker(update.clone()));
    }

    fn on_raw_frame(&self, frame: &[u8]) {
        self.forward(ClientEvent::RawFrame(
            String::from_utf8_lossy(frame).into_owned(),
        ));
    }

    fn on_close(&self, code: u16, reason: &str) {
        self.forward(ClientEvent::Closed {
            code,
            reason: reason.to_string(),
        });
    }

    fn on_ping(&self) {
        self.forward(ClientEvent::Ping);
    }

    fn on_pong(&self) {
        self.forward(ClientEvent::Pong);
    }

    fn on_failure(&self, error: &WsError) {
        self.forward(ClientEvent::Failure {
            kind: error.kind(),
            message: error.to_string(),
        });
    }
}
