//! Protocol-level errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A payload that is valid JSON but not a known request or reply.
    #[error("undecodable payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// An identity the protocol cannot carry (empty or oversized).
    #[error("invalid member address: {0}")]
    InvalidAddress(String),
}
