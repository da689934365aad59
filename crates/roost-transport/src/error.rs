//! Transport errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame that violates the length bound or does not parse.
    #[error("bad frame: {0}")]
    Frame(String),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Reply target has no live connection.
    #[error("no route to peer {0}")]
    UnknownPeer(String),

    /// The connection went away mid-exchange.
    #[error("connection closed")]
    Closed,
}
