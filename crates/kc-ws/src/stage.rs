//! Stage sequencing for the connection state machine.
//!
//! Every network step runs through `StageRunner::run`, which publishes the
//! new `ConnectionState`, refuses to start once shutdown is requested, and
//! races the step against its deadline and the shutdown token.

use crate::connection::ConnectionState;
use crate::error::{WsError, WsResult};
use crate::observer::StreamObserver;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub(crate) struct StageRunner {
    state: RwLock<ConnectionState>,
    observer: Arc<dyn StreamObserver>,
    shutdown_token: CancellationToken,
}

impl StageRunner {
    pub(crate) fn new(observer: Arc<dyn StreamObserver>) -> Self {
        Self {
            state: RwLock::new(ConnectionState::Idle),
            observer,
            shutdown_token: CancellationToken::new(),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub(crate) fn observer(&self) -> &dyn StreamObserver {
        self.observer.as_ref()
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    pub(crate) async fn cancelled(&self) {
        self.shutdown_token.cancelled().await;
    }

    /// Publish a state change without any shutdown check.
    pub(crate) fn set_state(&self, next: ConnectionState) {
        let previous = std::mem::replace(&mut *self.state.write(), next);
        if previous != next {
            debug!(from = %previous, to = %next, "State transition");
            self.observer.on_state(next);
        }
    }

    /// Move to `next` unless shutdown was requested.
    pub(crate) fn enter(&self, next: ConnectionState) -> WsResult<()> {
        if self.is_cancelled() {
            return Err(WsError::Cancelled);
        }
        self.set_state(next);
        Ok(())
    }

    /// Run one stage under an optional deadline.
    pub(crate) async fn run<T, F>(
        &self,
        state: ConnectionState,
        deadline: Option<Duration>,
        step: F,
    ) -> WsResult<T>
    where
        F: Future<Output = WsResult<T>>,
    {
        self.enter(state)?;

        let bounded = async {
            match deadline {
                Some(after) => match tokio::time::timeout(after, step).await {
                    Ok(result) => result,
                    Err(_) => Err(WsError::Timeout { state, after }),
                },
                None => step.await,
            }
        };

        tokio::select! {
            biased;
            () = self.shutdown_token.cancelled() => Err(WsError::Cancelled),
            result = bounded => result,
        }
    }
}
