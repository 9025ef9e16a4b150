use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    /// The link's I/O thread is gone; nothing more can be written.
    #[error("link to the remote engine is closed")]
    LinkClosed,

    #[error("malformed DAP frame: {0}")]
    Framing(String),
}
