//! Shared fixtures for kc-ws integration tests.

#![allow(dead_code)]

pub mod mock_rest;
pub mod mock_ws;

use kc_core::TradingMode;
use kc_ws::{BootstrapEndpoint, ClientConfig, StageTimeouts};
use std::net::SocketAddr;
use std::time::Duration;

/// Client configuration pointing at a plain-HTTP mock bootstrap server.
pub fn local_config(rest: SocketAddr) -> ClientConfig {
    let short = Duration::from_secs(2);
    ClientConfig {
        mode: TradingMode::Spot,
        bootstrap: BootstrapEndpoint {
            host: rest.ip().to_string(),
            port: rest.port(),
            tls: false,
            user_agent: "postman".to_string(),
        },
        timeouts: StageTimeouts {
            rest_connect: short,
            rest_tls: short,
            rest_write: short,
            rest_read: short,
            ws_connect: short,
            ws_tls: short,
        },
        retry_on_rejection: false,
    }
}
