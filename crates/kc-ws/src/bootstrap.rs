//! REST bootstrap: obtains a session token and relay candidates.
//!
//! Stages: resolve → connect → TLS (SNI = REST host) → request → response body,
//! each with its own deadline. The body must be
//! `{"code": "200000", "data": {"token": ..., "instanceServers": [...]}}`;
//! anything else is a protocol rejection. Transport failures are returned to
//! the caller, which decides whether to restart.

use crate::config::{BootstrapEndpoint, StageTimeouts, BULLET_PUBLIC_PATH};
use crate::connection::ConnectionState;
use crate::error::{WsError, WsResult};
use crate::stage::StageRunner;
use crate::transport;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::header::{ACCEPT, CONTENT_TYPE, HOST, USER_AGENT};
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use kc_core::{RelayCandidate, SessionToken};
use serde_json::{Map, Value};
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, info};

/// Response code signalling success.
pub const SUCCESS_CODE: &str = "200000";

/// Token and relay list from one successful bootstrap.
///
/// Fresh on every bootstrap; never carried across sessions.
#[derive(Debug, Clone)]
pub struct BootstrapGrant {
    pub token: SessionToken,
    /// Relays whose protocol is "websocket", in response order.
    pub candidates: Vec<RelayCandidate>,
}

/// Performs the bootstrap request sequence.
#[derive(Debug, Clone)]
pub struct BootstrapClient {
    endpoint: BootstrapEndpoint,
    timeouts: StageTimeouts,
}

impl BootstrapClient {
    pub fn new(endpoint: BootstrapEndpoint, timeouts: StageTimeouts) -> Self {
        Self { endpoint, timeouts }
    }

    pub(crate) async fn fetch(&self, stages: &StageRunner) -> WsResult<BootstrapGrant> {
        let host = self.endpoint.host.as_str();
        info!(host, port = self.endpoint.port, "Starting bootstrap");

        let addrs = stages
            .run(
                ConnectionState::ResolvingRest,
                None,
                transport::resolve(host, self.endpoint.port),
            )
            .await?;

        let tcp = stages
            .run(
                ConnectionState::ConnectingRest,
                Some(self.timeouts.rest_connect),
                transport::connect(&addrs),
            )
            .await?;

        let stream = stages
            .run(
                ConnectionState::HandshakingRest,
                Some(self.timeouts.rest_tls),
                transport::secure(tcp, host, self.endpoint.tls),
            )
            .await?;

        let request = self.build_request()?;

        let (_driver, response) = stages
            .run(
                ConnectionState::AwaitingRestResponse,
                Some(self.timeouts.rest_write),
                async move {
                    let (mut sender, connection) =
                        hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
                    // Connection task is owned by this attempt and aborted with it
                    let driver = AbortOnDropHandle::new(tokio::spawn(async move {
                        if let Err(e) = connection.await {
                            debug!(?e, "Bootstrap connection ended with error");
                        }
                    }));
                    let response = sender.send_request(request).await?;
                    Ok::<_, WsError>((driver, response))
                },
            )
            .await?;

        let status = response.status();
        let body = stages
            .run(
                ConnectionState::AwaitingRestResponse,
                Some(self.timeouts.rest_read),
                async move { Ok::<_, WsError>(response.into_body().collect().await?.to_bytes()) },
            )
            .await?;

        debug!(%status, bytes = body.len(), "Bootstrap response received");

        let grant = interpret_bullet_response(&body)?;
        info!(
            candidates = grant.candidates.len(),
            "Bootstrap granted token"
        );
        Ok(grant)
    }

    fn build_request(&self) -> WsResult<Request<Empty<Bytes>>> {
        Request::builder()
            .method(Method::POST)
            .uri(BULLET_PUBLIC_PATH)
            .header(HOST, self.endpoint.host.as_str())
            .header(ACCEPT, "*/*")
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, self.endpoint.user_agent.as_str())
            .body(Empty::new())
            .map_err(|e| WsError::InvalidEndpoint(format!("bootstrap request: {e}")))
    }
}

/// Interpret a bootstrap response body.
///
/// Any missing or mistyped field is a `MalformedBootstrap` error; a code
/// other than "200000" is `Rejected`. Entries whose protocol is not
/// "websocket" are skipped.
pub fn interpret_bullet_response(body: &[u8]) -> WsResult<BootstrapGrant> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| WsError::MalformedBootstrap(format!("invalid JSON: {e}")))?;

    let code = value.get("code").and_then(Value::as_str);
    if code != Some(SUCCESS_CODE) {
        return Err(WsError::Rejected(format!(
            "code={}, body={}",
            code.unwrap_or("<missing>"),
            String::from_utf8_lossy(body)
        )));
    }

    let data = value
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| WsError::MalformedBootstrap("could not find 'data'".to_string()))?;

    let token = str_field(data, "token")?;
    let servers = data
        .get("instanceServers")
        .and_then(Value::as_array)
        .ok_or_else(|| WsError::MalformedBootstrap("missing 'instanceServers'".to_string()))?;

    let mut candidates = Vec::with_capacity(servers.len());
    for server in servers {
        let server = server.as_object().ok_or_else(|| {
            WsError::MalformedBootstrap("instance server is not an object".to_string())
        })?;

        if server.get("protocol").and_then(Value::as_str) != Some("websocket") {
            continue;
        }

        candidates.push(RelayCandidate::new(
            str_field(server, "endpoint")?,
            bool_field(server, "encrypt")?,
            u64_field(server, "pingInterval")?,
            u64_field(server, "pingTimeout")?,
        ));
    }

    if token.is_empty() {
        return Err(WsError::MalformedBootstrap("empty token".to_string()));
    }
    if candidates.is_empty() {
        return Err(WsError::MalformedBootstrap(
            "no websocket instance servers".to_string(),
        ));
    }

    Ok(BootstrapGrant {
        token: SessionToken::new(token),
        candidates,
    })
}

fn str_field<'a>(object: &'a Map<String, Value>, key: &str) -> WsResult<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| WsError::MalformedBootstrap(format!("missing or non-string '{key}'")))
}

fn bool_field(object: &Map<String, Value>, key: &str) -> WsResult<bool> {
    object
        .get(key)
        .and_then(Value::as_bool)
        .ok_or_else(|| WsError::MalformedBootstrap(format!("missing or non-bool '{key}'")))
}

fn u64_field(object: &Map<String, Value>, key: &str) -> WsResult<u64> {
    object
        .get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| WsError::MalformedBootstrap(format!("missing or non-integer '{key}'")))
}
