//! KuCoin ticker stream client.
//!
//! Provides a resilient public ticker feed:
//! - REST bootstrap (`POST /api/v1/bullet-public`) for a token and relay list
//! - Relay selection (last encrypted candidate)
//! - TLS WebSocket session with relay-negotiated keep-alive
//! - Immediate restart of the whole cycle on transport failure or peer close
//! - Explicit connection state machine with per-stage deadlines

pub mod bootstrap;
pub mod config;
pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod observer;
pub mod relay;
pub mod subscription;

mod session;
mod stage;
mod transport;

pub use bootstrap::{interpret_bullet_response, BootstrapClient, BootstrapGrant};
pub use config::{BootstrapEndpoint, ClientConfig, StageTimeouts};
pub use connection::{ConnectionManager, ConnectionState};
pub use error::{ErrorKind, WsError, WsResult};
pub use heartbeat::{KeepAlive, KeepAlivePolicy};
pub use observer::{ChannelObserver, ClientEvent, NoopObserver, StreamObserver};
pub use relay::{random_connect_id, select_relay, RelayTarget};
pub use subscription::{build_subscribe_message, SubscriptionState, WatchList};
