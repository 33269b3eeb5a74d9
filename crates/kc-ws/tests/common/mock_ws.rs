//! Mock relay server.
//!
//! Each connection gets a welcome frame, waits for the subscribe message,
//! sends one ticker and then follows its [`WsBehaviour`].

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

pub const TICKER_FRAME: &str = r#"{"type":"message","topic":"/market/ticker:BTC-USDT","subject":"trade.ticker","data":{"bestAsk":"50001","bestBid":"50000","price":"50000.5","sequence":"1","size":"0.01","time":1700000000000}}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsBehaviour {
    /// Send a close frame right after the ticker.
    CloseAfterTicker,
    /// Keep reading (and answering pings) until the client leaves.
    HoldOpen,
    /// Stop reading entirely; pings go unanswered.
    GoSilent,
    /// Ping the client before the ticker, then hold open.
    PingBeforeTicker,
}

pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    uris: Arc<Mutex<Vec<String>>>,
    messages: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<u32>>,
}

impl MockWsServer {
    pub async fn start(behaviour: WsBehaviour) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let uris: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let messages: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let connections: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let uris_clone = uris.clone();
        let messages_clone = messages.clone();
        let connections_clone = connections.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(
                            stream,
                            behaviour,
                            uris_clone.clone(),
                            messages_clone.clone(),
                            connections_clone.clone(),
                        ));
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            uris,
            messages,
            connections,
        }
    }

    /// Relay endpoint as advertised by the bootstrap response.
    pub fn endpoint(&self) -> String {
        format!("ws://{}/", self.addr)
    }

    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// Request URIs of completed upgrades, in order.
    pub async fn request_uris(&self) -> Vec<String> {
        self.uris.lock().await.clone()
    }

    /// Text frames received from clients.
    pub async fn received_messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    behaviour: WsBehaviour,
    uris: Arc<Mutex<Vec<String>>>,
    messages: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<u32>>,
) {
    {
        let mut count = connections.lock().await;
        *count += 1;
    }

    let mut uri = None;
    let ws_stream = match accept_hdr_async(stream, |request: &Request, response: Response| {
        uri = Some(request.uri().to_string());
        Ok::<_, ErrorResponse>(response)
    })
    .await
    {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };
    if let Some(uri) = uri {
        uris.lock().await.push(uri);
    }

    let (mut write, mut read) = ws_stream.split();

    let welcome = r#"{"id":"welcome","type":"welcome"}"#.to_string();
    if write.send(Message::Text(welcome)).await.is_err() {
        return;
    }

    // Wait for the subscribe message
    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                messages.lock().await.push(text);
                break;
            }
            Ok(Message::Close(_)) | Err(_) => return,
            _ => {}
        }
    }

    if behaviour == WsBehaviour::PingBeforeTicker
        && write.send(Message::Ping(b"relay".to_vec())).await.is_err()
    {
        return;
    }

    if write
        .send(Message::Text(TICKER_FRAME.to_string()))
        .await
        .is_err()
    {
        return;
    }

    match behaviour {
        WsBehaviour::CloseAfterTicker => {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "bye".into(),
            };
            let _ = write.send(Message::Close(Some(frame))).await;
            // Drain until the client acknowledges the close
            while let Some(Ok(_)) = read.next().await {}
        }
        WsBehaviour::HoldOpen | WsBehaviour::PingBeforeTicker => {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => messages.lock().await.push(text),
                    Ok(Message::Ping(data)) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Ok(Message::Close(_)) | Err(_) => break,
                    _ => {}
                }
            }
        }
        WsBehaviour::GoSilent => {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    }
}
