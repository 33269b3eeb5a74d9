//! Keep-alive for a streaming session.
//!
//! Derived from relay metadata: `pingTimeout` is the idle timeout and
//! `pingInterval` bounds the WebSocket upgrade. After half the idle timeout
//! without any frame a ping is sent; after the full idle timeout the session
//! fails. A zero idle timeout disables keep-alive.

use chrono::{DateTime, Utc};
use kc_core::RelayCandidate;
use parking_lot::RwLock;
use std::time::Duration;
use tracing::debug;

/// Lower bound for the check cadence.
const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(5);

/// Timing negotiated from the selected relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlivePolicy {
    pub idle_timeout: Duration,
    pub handshake_timeout: Duration,
}

impl KeepAlivePolicy {
    pub fn from_relay(relay: &RelayCandidate) -> Self {
        Self {
            idle_timeout: relay.ping_timeout(),
            handshake_timeout: relay.ping_interval(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.idle_timeout.is_zero()
    }

    /// Silence after which a ping is sent.
    pub fn ping_after(&self) -> Duration {
        self.idle_timeout / 2
    }

    /// Deadline for the WebSocket upgrade; none when the relay reports 0.
    pub fn handshake_deadline(&self) -> Option<Duration> {
        (!self.handshake_timeout.is_zero()).then_some(self.handshake_timeout)
    }

    fn check_interval(&self) -> Duration {
        (self.ping_after() / 2).max(MIN_CHECK_INTERVAL)
    }
}

/// Per-session liveness tracker.
pub struct KeepAlive {
    policy: KeepAlivePolicy,
    last_frame: RwLock<DateTime<Utc>>,
    last_ping: RwLock<Option<DateTime<Utc>>>,
    last_pong: RwLock<Option<DateTime<Utc>>>,
    awaiting_pong: RwLock<bool>,
}

impl KeepAlive {
    pub fn new(policy: KeepAlivePolicy) -> Self {
        Self {
            policy,
            last_frame: RwLock::new(Utc::now()),
            last_ping: RwLock::new(None),
            last_pong: RwLock::new(None),
            awaiting_pong: RwLock::new(false),
        }
    }

    /// Any frame from the relay counts as activity.
    pub fn record_frame(&self) {
        *self.last_frame.write() = Utc::now();
        *self.awaiting_pong.write() = false;
    }

    pub fn record_ping(&self) {
        let now = Utc::now();
        *self.last_ping.write() = Some(now);
        *self.awaiting_pong.write() = true;
        debug!(time = %now, "Keep-alive ping sent");
    }

    pub fn record_pong(&self) {
        let now = Utc::now();
        *self.last_pong.write() = Some(now);
        self.record_frame();

        if let Some(ping_time) = *self.last_ping.read() {
            let rtt_ms = (now - ping_time).num_milliseconds();
            debug!(rtt_ms, "Keep-alive pong received");
        }
    }

    pub fn time_since_last_frame(&self) -> Duration {
        (Utc::now() - *self.last_frame.read())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// No frame for the full idle timeout.
    pub fn is_timed_out(&self) -> bool {
        self.policy.is_enabled() && self.time_since_last_frame() >= self.policy.idle_timeout
    }

    pub fn should_send_ping(&self) -> bool {
        self.policy.is_enabled()
            && !*self.awaiting_pong.read()
            && self.time_since_last_frame() >= self.policy.ping_after()
    }

    /// Wait for the next check; never completes when keep-alive is disabled.
    pub async fn wait_for_check(&self) {
        if !self.policy.is_enabled() {
            return std::future::pending().await;
        }
        tokio::time::sleep(self.policy.check_interval()).await;
    }

    pub fn stats(&self) -> KeepAliveStats {
        KeepAliveStats {
            last_ping: *self.last_ping.read(),
            last_pong: *self.last_pong.read(),
            last_frame: *self.last_frame.read(),
            awaiting_pong: *self.awaiting_pong.read(),
            time_since_last_frame_ms: self.time_since_last_frame().as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeepAliveStats {
    pub last_ping: Option<DateTime<Utc>>,
    pub last_pong: Option<DateTime<Utc>>,
    pub last_frame: DateTime<Utc>,
    pub awaiting_pong: bool,
    pub time_since_last_frame_ms: u64,
}
