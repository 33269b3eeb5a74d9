//! One WebSocket session against the selected relay.
//!
//! Resolve → connect → TLS → upgrade → subscribe → read until failure.
//! The session never ends successfully: a close frame, read error or
//! keep-alive timeout hands control back to the reconnect loop.

use crate::bootstrap::BootstrapGrant;
use crate::config::StageTimeouts;
use crate::connection::ConnectionState;
use crate::error::{WsError, WsResult};
use crate::heartbeat::{KeepAlive, KeepAlivePolicy};
use crate::relay::{random_connect_id, select_relay, RelayTarget};
use crate::stage::StageRunner;
use crate::subscription::SubscriptionState;
use crate::transport;
use futures_util::{SinkExt, StreamExt};
use kc_feed::TickerDecoder;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::client_async_with_config;
use tracing::{debug, info, warn};

/// What woke the read loop.
enum Wake {
    Cancelled,
    Frame(Option<Result<Message, tungstenite::Error>>),
    KeepAliveCheck,
}

pub(crate) struct StreamSession<'a> {
    stages: &'a StageRunner,
    timeouts: &'a StageTimeouts,
    subscription: &'a SubscriptionState,
    decoder: TickerDecoder,
}

impl<'a> StreamSession<'a> {
    pub(crate) fn new(
        stages: &'a StageRunner,
        timeouts: &'a StageTimeouts,
        subscription: &'a SubscriptionState,
        decoder: TickerDecoder,
    ) -> Self {
        Self {
            stages,
            timeouts,
            subscription,
            decoder,
        }
    }

    pub(crate) async fn run(&self, grant: BootstrapGrant) -> WsResult<()> {
        let relay = select_relay(&grant.candidates)?;
        let target = RelayTarget::parse(&relay.endpoint)?;
        let policy = KeepAlivePolicy::from_relay(relay);
        info!(
            endpoint = %relay.endpoint,
            ping_interval_ms = relay.ping_interval_ms,
            ping_timeout_ms = relay.ping_timeout_ms,
            "Selected relay"
        );

        let addrs = self
            .stages
            .run(
                ConnectionState::ResolvingWs,
                None,
                transport::resolve(&target.host, target.port),
            )
            .await?;

        let tcp = self
            .stages
            .run(
                ConnectionState::ConnectingWs,
                Some(self.timeouts.ws_connect),
                transport::connect(&addrs),
            )
            .await?;

        // rustls `ServerName` accepts only a DNS name or IP, so SNI is the bare host
        debug!(sni = %format!("{}:{}", target.host, target.port), "Starting relay TLS");
        let stream = self
            .stages
            .run(
                ConnectionState::HandshakingWs,
                Some(self.timeouts.ws_tls),
                transport::secure(tcp, &target.host, target.tls),
            )
            .await?;

        let url = target.upgrade_url(&grant.token, &random_connect_id());
        let request = url.into_client_request()?;
        let (ws, response) = self
            .stages
            .run(
                ConnectionState::NegotiatingWs,
                policy.handshake_deadline(),
                async move { Ok::<_, WsError>(client_async_with_config(request, stream, None).await?) },
            )
            .await?;
        debug!(status = %response.status(), "WebSocket upgrade complete");

        self.stages.enter(ConnectionState::Subscribing)?;
        let (mut write, mut read) = ws.split();
        let keep_alive = KeepAlive::new(policy);
        let mut subscribed = false;

        loop {
            let wake = tokio::select! {
                biased;
                () = self.stages.cancelled() => Wake::Cancelled,
                frame = read.next() => Wake::Frame(frame),
                () = keep_alive.wait_for_check() => Wake::KeepAliveCheck,
            };

            let frame = match wake {
                Wake::Cancelled => {
                    info!("Shutdown requested, leaving read loop");
                    return Err(WsError::Cancelled);
                }
                Wake::KeepAliveCheck => {
                    if keep_alive.is_timed_out() {
                        let stats = keep_alive.stats();
                        warn!(?stats, "Keep-alive timeout");
                        return Err(WsError::KeepAliveTimeout(policy.idle_timeout));
                    }
                    if keep_alive.should_send_ping() {
                        write.send(Message::Ping(Vec::new())).await?;
                        keep_alive.record_ping();
                    }
                    continue;
                }
                Wake::Frame(None) => {
                    warn!("WebSocket stream ended");
                    return Err(WsError::ConnectionClosed {
                        code: 1006,
                        reason: "stream ended".to_string(),
                    });
                }
                Wake::Frame(Some(Err(e))) => {
                    warn!(?e, "WebSocket read error");
                    return Err(e.into());
                }
                Wake::Frame(Some(Ok(frame))) => frame,
            };

            keep_alive.record_frame();
            match frame {
                Message::Text(text) => self.interpret(text.as_bytes())?,
                Message::Binary(data) => self.interpret(&data)?,
                Message::Ping(_) => {
                    debug!("Ping received");
                    self.stages.observer().on_ping();
                    continue;
                }
                Message::Pong(_) => {
                    keep_alive.record_pong();
                    self.stages.observer().on_pong();
                    continue;
                }
                Message::Close(frame) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    warn!(code, %reason, "WebSocket closed by relay");
                    self.stages.observer().on_close(code, &reason);
                    return Err(WsError::ConnectionClosed { code, reason });
                }
                Message::Frame(_) => continue,
            }

            if !subscribed {
                let text = self.subscription.subscribe_message();
                write.send(Message::Text(text)).await?;
                subscribed = true;
                info!("Subscription sent");
                self.stages.enter(ConnectionState::Streaming)?;
            }
        }
    }

    /// Decode one data frame and report it.
    fn interpret(&self, frame: &[u8]) -> WsResult<()> {
        if self.stages.is_cancelled() {
            return Err(WsError::Cancelled);
        }

        match self.decoder.decode(frame) {
            Some(update) => {
                info!(symbol = %update.symbol, price = %update.price, "Ticker");
                self.stages.observer().on_ticker(&update);
            }
            None => {
                debug!(raw = %String::from_utf8_lossy(frame), "Non-ticker frame");
                self.stages.observer().on_raw_frame(frame);
            }
        }
        Ok(())
    }
}
