#![forbid(unsafe_code)]

use serde::Deserialize;
use thiserror::Error;

/// Failure reported by the remote service in an `ERROR` or `COMMAND_ERROR` response.
#[derive(Debug, Clone, PartialEq, Eq, Error, Deserialize)]
#[error("{code}: {msg}")]
pub struct RemoteError {
    #[serde(default, deserialize_with = "crate::wire::code_string")]
    pub code: String,
    #[serde(default)]
    pub msg: String,
}

impl RemoteError {
    pub fn new(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            msg: msg.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel used before the connection was established")]
    NotConnected,
    #[error("connection closed")]
    Closed,
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("remote error {0}")]
    Remote(#[from] RemoteError),
    #[error("unexpected response payload: {0}")]
    Decode(#[source] serde_json::Error),
}

impl RequestError {
    pub fn remote_code(&self) -> Option<&str> {
        match self {
            RequestError::Remote(err) => Some(err.code.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum KeymapError {
    #[error("invalid key combo '{combo}': {message}")]
    InvalidCombo { combo: String, message: String },
    #[error("invalid guard '{guard}' in {scope} keymap: {message}")]
    InvalidGuard {
        scope: String,
        guard: String,
        message: String,
    },
    #[error("failed to read keymap: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse keymap: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to open log file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to install subscriber: {0}")]
    Install(String),
}

/// Startup failures of the composed service.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Keymap(#[from] KeymapError),
}
