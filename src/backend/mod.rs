//! The command boundary to the backend process.
//!
//! The backend owns every side effect (git, file system, process launching,
//! secret storage, remote APIs). This side only issues named commands with a
//! small JSON argument object and decodes the JSON result.

mod api;
pub mod dto;
mod process;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use api::Api;
pub use process::ProcessBackend;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend ran the command and reported a failure.
    #[error("{message}")]
    Command { command: String, message: String },
    #[error("backend transport error: {0}")]
    Transport(String),
    #[error("backend protocol error: {0}")]
    Protocol(String),
    #[error("unexpected response to {command}: {message}")]
    Decode { command: String, message: String },
    #[error("{command} timed out after {secs}s")]
    Timeout { command: String, secs: u64 },
}

pub type BackendResult<T> = Result<T, BackendError>;

#[async_trait]
pub trait Backend: Send + Sync {
    async fn invoke(&self, command: &str, args: Value) -> BackendResult<Value>;
}
