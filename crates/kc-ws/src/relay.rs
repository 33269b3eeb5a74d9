//! Relay selection and upgrade URL construction.

use crate::error::{WsError, WsResult};
use kc_core::{RelayCandidate, SessionToken};
use rand::Rng;
use tokio_tungstenite::tungstenite::http::Uri;

/// Alphabet for the `connectId` nonce.
const CONNECT_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_";
/// Length of the `connectId` nonce.
pub const CONNECT_ID_LEN: usize = 10;

/// Pick the relay to connect to: the last candidate that supports encryption.
///
/// Never falls back to an unencrypted relay.
pub fn select_relay(candidates: &[RelayCandidate]) -> WsResult<&RelayCandidate> {
    candidates
        .iter()
        .rev()
        .find(|candidate| candidate.encrypted)
        .ok_or(WsError::NoEncryptedRelay)
}

/// Connection target parsed from a relay endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayTarget {
    pub tls: bool,
    pub host: String,
    /// Explicit port, or 443 (TLS) / 80 (plain).
    pub port: u16,
    /// Host with the port only if the endpoint named one.
    authority: String,
    path: String,
}

impl RelayTarget {
    pub fn parse(endpoint: &str) -> WsResult<Self> {
        let uri: Uri = endpoint
            .parse()
            .map_err(|e| WsError::InvalidEndpoint(format!("{endpoint}: {e}")))?;

        let tls = match uri.scheme_str() {
            Some("wss") | Some("https") => true,
            Some("ws") | Some("http") => false,
            other => {
                return Err(WsError::InvalidEndpoint(format!(
                    "{endpoint}: unsupported scheme {other:?}"
                )))
            }
        };

        let authority = uri
            .authority()
            .ok_or_else(|| WsError::InvalidEndpoint(format!("{endpoint}: missing host")))?;
        let host = authority.host();
        if host.is_empty() {
            return Err(WsError::InvalidEndpoint(format!("{endpoint}: empty host")));
        }

        let port = uri.port_u16().unwrap_or(if tls { 443 } else { 80 });
        let path = match uri.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        Ok(Self {
            tls,
            host: host.to_string(),
            port,
            authority: authority.as_str().to_string(),
            path,
        })
    }

    /// `<scheme>://<authority><path>?token=<token>&connectId=<id>`
    pub fn upgrade_url(&self, token: &SessionToken, connect_id: &str) -> String {
        let scheme = if self.tls { "wss" } else { "ws" };
        format!(
            "{scheme}://{}{}?token={}&connectId={connect_id}",
            self.authority,
            self.path,
            token.as_str()
        )
    }
}

/// Random `connectId`: 10 characters from `[a-zA-Z_]`.
pub fn random_connect_id() -> String {
    let mut rng = rand::thread_rng();
    (0..CONNECT_ID_LEN)
        .map(|_| CONNECT_ID_ALPHABET[rng.gen_range(0..CONNECT_ID_ALPHABET.len())] as char)
        .collect()
}
