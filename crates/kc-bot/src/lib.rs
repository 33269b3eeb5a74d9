//! KuCoin ticker stream client application.
//!
//! Wires configuration, logging and the connection manager together and
//! runs until Ctrl-C.

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, SessionStats};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
