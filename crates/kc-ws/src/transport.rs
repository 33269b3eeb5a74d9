//! Resolve, connect and TLS steps shared by the bootstrap and the stream.
//!
//! Each call builds fresh objects; nothing is pooled across attempts.

use crate::error::{WsError, WsResult};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{lookup_host, TcpStream};
use tokio_rustls::TlsConnector;
use tokio_tungstenite::MaybeTlsStream;
use tracing::debug;

/// TCP stream, TLS-wrapped unless the endpoint is plain.
pub(crate) type SecureStream = MaybeTlsStream<TcpStream>;

pub(crate) async fn resolve(host: &str, port: u16) -> WsResult<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|source| WsError::Resolve {
            host: host.to_string(),
            source,
        })?
        .collect();

    if addrs.is_empty() {
        return Err(WsError::NoAddress(host.to_string()));
    }
    debug!(host, port, count = addrs.len(), "Resolved");
    Ok(addrs)
}

/// Connect to the first address that accepts, in resolver order.
pub(crate) async fn connect(addrs: &[SocketAddr]) -> WsResult<TcpStream> {
    let mut last_error = None;

    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                // Latency over throughput for small frames
                if let Err(e) = stream.set_nodelay(true) {
                    debug!(?e, "Failed to set TCP_NODELAY");
                }
                debug!(%addr, "TCP connected");
                return Ok(stream);
            }
            Err(e) => {
                debug!(%addr, ?e, "TCP connect failed, trying next address");
                last_error = Some(e);
            }
        }
    }

    Err(WsError::Connect(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "no address to connect to")
    })))
}

/// Run the TLS client handshake with `server_name` as SNI.
pub(crate) async fn secure(tcp: TcpStream, server_name: &str, tls: bool) -> WsResult<SecureStream> {
    if !tls {
        return Ok(MaybeTlsStream::Plain(tcp));
    }

    // rustls expects IPv6 addresses without the surrounding [] brackets
    let name = server_name.trim_start_matches('[').trim_end_matches(']');
    let domain = ServerName::try_from(name.to_string())
        .map_err(|e| WsError::Tls(format!("invalid server name {name}: {e}")))?;

    let connector = TlsConnector::from(tls_config()?);
    let stream = connector
        .connect(domain, tcp)
        .await
        .map_err(|e| WsError::Tls(e.to_string()))?;

    debug!(server_name = name, "TLS handshake complete");
    Ok(MaybeTlsStream::Rustls(stream))
}

fn tls_config() -> WsResult<Arc<ClientConfig>> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config =
        ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .map_err(|e| WsError::Tls(e.to_string()))?
            .with_root_certificates(roots)
            .with_no_client_auth();

    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_resolve_localhost() {
        let addrs = resolve("127.0.0.1", 8080).await.unwrap();
        assert_eq!(addrs, vec!["127.0.0.1:8080".parse::<SocketAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn test_connect_skips_refused_address() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let good = listener.local_addr().unwrap();

        // Bind then drop to get a port nobody listens on
        let refused = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap()
        };

        let stream = connect(&[refused, good]).await.unwrap();
        assert_eq!(stream.peer_addr().unwrap(), good);
    }

    #[tokio::test]
    async fn test_connect_with_no_addresses_fails() {
        assert!(matches!(connect(&[]).await, Err(WsError::Connect(_))));
    }

    #[tokio::test]
    async fn test_secure_plain_passthrough() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let tcp = TcpStream::connect(addr).await.unwrap();
        let stream = secure(tcp, "localhost", false).await.unwrap();
        assert!(matches!(stream, MaybeTlsStream::Plain(_)));
    }

    #[test]
    fn test_tls_config_builds() {
        assert!(tls_config().is_ok());
    }
}
