//! Application wiring.

use crate::config::AppConfig;
use crate::error::AppResult;
use kc_ws::{ChannelObserver, ClientEvent, ConnectionManager, ConnectionState};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Capacity of the observer event channel.
const EVENT_BUFFER: usize = 1024;

/// Counters accumulated over the lifetime of the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub tickers: u64,
    pub raw_frames: u64,
    pub closes: u64,
    pub failures: u64,
    pub sessions: u64,
}

impl SessionStats {
    fn record(&mut self, event: &ClientEvent) {
        match event {
            ClientEvent::Ticker(_) => self.tickers += 1,
            ClientEvent::RawFrame(_) => self.raw_frames += 1,
            ClientEvent::Closed { .. } => self.closes += 1,
            ClientEvent::Failure { .. } => self.failures += 1,
            ClientEvent::State(ConnectionState::Streaming) => self.sessions += 1,
            _ => {}
        }
    }
}

pub struct Application {
    config: AppConfig,
    manager: Arc<ConnectionManager>,
    events: mpsc::Receiver<ClientEvent>,
    stats: SessionStats,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let (observer, events) = ChannelObserver::channel(EVENT_BUFFER);
        let manager = Arc::new(ConnectionManager::with_observer(
            config.client_config(),
            Arc::new(observer),
        ));
        for symbol in &config.symbols {
            manager.add_subscription(symbol);
        }

        Ok(Self {
            config,
            manager,
            events,
            stats: SessionStats::default(),
        })
    }

    pub fn manager(&self) -> Arc<ConnectionManager> {
        self.manager.clone()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(?e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
        .map(|_| ())
    }

    /// Run until `shutdown` completes or the client gives up.
    pub async fn run_until<F>(mut self, shutdown: F) -> AppResult<SessionStats>
    where
        F: Future<Output = ()>,
    {
        info!(
            mode = %self.config.mode,
            watch_list = %self.manager.watch_list(),
            "Starting client"
        );

        let mut handle = self.manager.clone().start();
        tokio::pin!(shutdown);

        let finished = loop {
            tokio::select! {
                Some(event) = self.events.recv() => self.handle_event(event),
                result = &mut handle => break Some(result),
                () = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.manager.shutdown();
                    break None;
                }
            }
        };

        let result = match finished {
            Some(result) => result?,
            None => handle.await?,
        };

        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
        }
        info!(stats = ?self.stats, state = %self.manager.state(), "Client stopped");

        result?;
        Ok(self.stats)
    }

    fn handle_event(&mut self, event: ClientEvent) {
        self.stats.record(&event);
        match &event {
            ClientEvent::Failure { kind, message } => {
                warn!(?kind, %message, failures = self.stats.failures, "Attempt failed");
            }
            ClientEvent::State(ConnectionState::Streaming) => {
                info!(sessions = self.stats.sessions, "Streaming");
            }
            _ => debug!(?event, "Client event"),
        }
    }
}
