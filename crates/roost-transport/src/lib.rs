//! Roost transport layer.
//!
//! Two interaction shapes over plain TCP with length-prefixed JSON frames:
//!
//! - [`RoutedListener`]: the routed-socket pattern, where a central endpoint
//!   receives frames tagged with the sender's identity and can reply to any
//!   previously seen identity asynchronously.
//! - [`RequestClient`]: the request/reply pattern, where a client sends one
//!   payload and waits for one reply.
//!
//! Payloads are opaque `serde_json::Value`s to this crate; the protocol
//! vocabulary lives in `roost-protocol` and is decoded by the routers.

pub mod error;
pub mod framing;
pub mod request;
pub mod routed;

pub use error::TransportError;
pub use framing::{Envelope, MAX_FRAME_LEN};
pub use request::RequestClient;
pub use routed::RoutedListener;
