//! Connection manager.
//!
//! Drives the bootstrap → stream cycle. Every transport failure or peer
//! close restarts from the bootstrap with a fresh token, immediately and
//! without an attempt cap. The shutdown token is the only way out.

use crate::bootstrap::BootstrapClient;
use crate::config::ClientConfig;
use crate::error::{ErrorKind, WsError, WsResult};
use crate::observer::{NoopObserver, StreamObserver};
use crate::session::StreamSession;
use crate::stage::StageRunner;
use crate::subscription::SubscriptionState;
use kc_feed::TickerDecoder;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Lifecycle stage of the client. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Idle,
    ResolvingRest,
    ConnectingRest,
    HandshakingRest,
    AwaitingRestResponse,
    ResolvingWs,
    ConnectingWs,
    HandshakingWs,
    NegotiatingWs,
    Subscribing,
    Streaming,
    Stopped,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ResolvingRest => "resolving_rest",
            Self::ConnectingRest => "connecting_rest",
            Self::HandshakingRest => "handshaking_rest",
            Self::AwaitingRestResponse => "awaiting_rest_response",
            Self::ResolvingWs => "resolving_ws",
            Self::ConnectingWs => "connecting_ws",
            Self::HandshakingWs => "handshaking_ws",
            Self::NegotiatingWs => "negotiating_ws",
            Self::Subscribing => "subscribing",
            Self::Streaming => "streaming",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticker stream client.
pub struct ConnectionManager {
    config: ClientConfig,
    stages: StageRunner,
    bootstrap: BootstrapClient,
    subscription: SubscriptionState,
    decoder: TickerDecoder,
    running: AtomicBool,
    attempts: AtomicU64,
}

impl ConnectionManager {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_observer(config, Arc::new(NoopObserver))
    }

    pub fn with_observer(config: ClientConfig, observer: Arc<dyn StreamObserver>) -> Self {
        Self {
            stages: StageRunner::new(observer),
            bootstrap: BootstrapClient::new(config.bootstrap.clone(), config.timeouts),
            subscription: SubscriptionState::new(config.mode),
            decoder: TickerDecoder::new(config.mode),
            running: AtomicBool::new(false),
            attempts: AtomicU64::new(0),
            config,
        }
    }

    /// Append a symbol to the watch list (comma-joined, duplicates kept).
    ///
    /// Only symbols added before the first session are subscribed.
    pub fn add_subscription(&self, symbol: &str) {
        self.subscription.add(symbol);
    }

    pub fn watch_list(&self) -> String {
        self.subscription.watch_list()
    }

    pub fn state(&self) -> ConnectionState {
        self.stages.state()
    }

    /// Request shutdown. In-flight stages are interrupted and no further
    /// network operation is started.
    pub fn shutdown(&self) {
        info!("ConnectionManager shutdown requested");
        self.stages.shutdown();
    }

    pub fn is_shutdown(&self) -> bool {
        self.stages.is_cancelled()
    }

    /// Number of bootstrap attempts started so far.
    pub fn attempt_count(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Run until shutdown (`Ok`) or an unretried rejection (`Err`).
    pub async fn run(&self) -> WsResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(WsError::AlreadyRunning);
        }
        let _guard = RunGuard {
            running: &self.running,
            stages: &self.stages,
        };
        self.reconnect_loop().await
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn start(self: Arc<Self>) -> JoinHandle<WsResult<()>> {
        tokio::spawn(async move { self.run().await })
    }

    async fn reconnect_loop(&self) -> WsResult<()> {
        loop {
            if self.is_shutdown() {
                info!("Shutdown requested, exiting connect loop");
                self.stages.set_state(ConnectionState::Stopped);
                return Ok(());
            }

            let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;

            match self.attempt().await {
                Ok(()) => info!(attempt, "Stream session ended"),
                Err(e) => match e.kind() {
                    ErrorKind::Cancelled => {
                        info!(attempt, "Attempt interrupted by shutdown");
                        self.stages.set_state(ConnectionState::Stopped);
                        return Ok(());
                    }
                    ErrorKind::Transport => {
                        warn!(attempt, error = %e, "Transport failure, restarting bootstrap");
                        self.stages.observer().on_failure(&e);
                    }
                    ErrorKind::Protocol => {
                        error!(attempt, error = %e, "Attempt abandoned");
                        self.stages.observer().on_failure(&e);
                        if !self.config.retry_on_rejection {
                            self.stages.set_state(ConnectionState::Idle);
                            return Err(e);
                        }
                    }
                },
            }

            tokio::task::yield_now().await;
        }
    }

    async fn attempt(&self) -> WsResult<()> {
        let grant = self.bootstrap.fetch(&self.stages).await?;
        StreamSession::new(
            &self.stages,
            &self.config.timeouts,
            &self.subscription,
            self.decoder,
        )
        .run(grant)
        .await
    }
}

/// Releases the single-flight flag when `run` ends, including when its
/// future is dropped or its task aborted mid-stage.
struct RunGuard<'a> {
    running: &'a AtomicBool,
    stages: &'a StageRunner,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        match self.stages.state() {
            ConnectionState::Idle | ConnectionState::Stopped => {}
            interrupted => {
                warn!(state = %interrupted, "Run interrupted, resetting to idle");
                self.stages.set_state(ConnectionState::Idle);
            }
        }
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::ChannelObserver;

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Idle.to_string(), "idle");
        assert_eq!(
            ConnectionState::AwaitingRestResponse.to_string(),
            "awaiting_rest_response"
        );
        assert_eq!(ConnectionState::Stopped.to_string(), "stopped");
    }

    #[test]
    fn test_add_subscription_builds_watch_list() {
        let manager = ConnectionManager::new(ClientConfig::default());
        manager.add_subscription("A");
        manager.add_subscription("B");
        assert_eq!(manager.watch_list(), "A,B");
        assert_eq!(manager.state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_shutdown_before_run_stops_without_attempt() {
        let (observer, mut rx) = ChannelObserver::channel(8);
        let manager = ConnectionManager::with_observer(ClientConfig::default(), Arc::new(observer));
        manager.shutdown();

        manager.run().await.unwrap();

        assert_eq!(manager.state(), ConnectionState::Stopped);
        assert_eq!(manager.attempt_count(), 0);
        assert_eq!(
            rx.try_recv().unwrap(),
            crate::observer::ClientEvent::State(ConnectionState::Stopped)
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_second_run_is_rejected() {
        let manager = Arc::new(ConnectionManager::new(ClientConfig::default()));
        manager.running.store(true, Ordering::Release);
        assert!(matches!(manager.run().await, Err(WsError::AlreadyRunning)));
    }

}
