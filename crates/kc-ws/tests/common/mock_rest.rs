//! Mock bootstrap server.
//!
//! Speaks just enough HTTP/1.1 to answer `POST /api/v1/bullet-public` from a
//! script of replies. The last reply repeats once the script runs out.

use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};

/// How the server answers one request.
#[derive(Debug, Clone)]
pub enum RestReply {
    /// Success with a fresh token and a single relay.
    Grant { endpoint: String, encrypted: bool, ping_timeout_ms: u64 },
    /// Application-level rejection.
    Reject,
    /// Read the request, then hang up without answering.
    Drop,
    /// Read the request and never answer.
    Stall,
}

impl RestReply {
    pub fn grant(endpoint: impl Into<String>) -> Self {
        Self::Grant {
            endpoint: endpoint.into(),
            encrypted: true,
            ping_timeout_ms: 10000,
        }
    }
}

pub struct MockRestServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    hits: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockRestServer {
    pub async fn start(script: Vec<RestReply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicU32::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let script = Arc::new(script);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let hits_clone = hits.clone();
        let requests_clone = requests.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let hit = hits_clone.fetch_add(1, Ordering::SeqCst) + 1;
                        let index = (hit as usize - 1).min(script.len() - 1);
                        let reply = script[index].clone();
                        tokio::spawn(handle_request(stream, hit, reply, requests_clone.clone()));
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            hits,
            requests,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of accepted bootstrap connections.
    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }

    /// Raw request heads received so far.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_request(
    mut stream: TcpStream,
    hit: u32,
    reply: RestReply,
    requests: Arc<Mutex<Vec<String>>>,
) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    requests
        .lock()
        .await
        .push(String::from_utf8_lossy(&head).into_owned());

    let body = match reply {
        RestReply::Drop => return,
        RestReply::Stall => {
            std::future::pending::<()>().await;
            return;
        }
        RestReply::Reject => json!({"code": "400100", "msg": "rejected"}),
        RestReply::Grant {
            endpoint,
            encrypted,
            ping_timeout_ms,
        } => json!({
            "code": "200000",
            "data": {
                "token": format!("token-{hit}"),
                "instanceServers": [{
                    "endpoint": endpoint,
                    "encrypt": encrypted,
                    "protocol": "websocket",
                    "pingInterval": 5000,
                    "pingTimeout": ping_timeout_ms
                }]
            }
        }),
    }
    .to_string();

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}
