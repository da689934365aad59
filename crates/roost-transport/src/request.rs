//! Request/reply client: the member side of a tier endpoint.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use roost_protocol::MemberId;

use crate::framing::{read_frame, write_frame, Envelope};
use crate::TransportError;

/// One connection to a manager tier. Send one payload, then wait for one
/// reply; waiting can be resumed after a timeout without resending.
pub struct RequestClient {
    identity: MemberId,
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
}

impl RequestClient {
    pub async fn connect(addr: &str, identity: MemberId) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true).ok();
        let (reader, writer) = stream.into_split();
        Ok(Self { identity, reader, writer })
    }

    pub fn identity(&self) -> &MemberId {
        &self.identity
    }

    /// Send one payload, wrapped in this client's identity envelope.
    pub async fn send<T: Serialize>(&mut self, payload: &T) -> Result<(), TransportError> {
        let envelope = Envelope {
            from: self.identity.clone(),
            payload: serde_json::to_value(payload)?,
        };
        write_frame(&mut self.writer, &envelope).await
    }

    /// Wait up to `timeout` for the next reply frame. `Ok(None)` on timeout;
    /// callers may simply wait again.
    pub async fn recv(&mut self, timeout: Duration) -> Result<Option<Value>, TransportError> {
        match tokio::time::timeout(timeout, read_frame(&mut self.reader)).await {
            Err(_elapsed) => Ok(None),
            Ok(Ok(Some(value))) => Ok(Some(value)),
            Ok(Ok(None)) => Err(TransportError::Closed),
            Ok(Err(e)) => Err(e),
        }
    }

    /// One request/reply exchange.
    pub async fn request<T: Serialize>(
        &mut self,
        payload: &T,
        timeout: Duration,
    ) -> Result<Option<Value>, TransportError> {
        self.send(payload).await?;
        self.recv(timeout).await
    }
}
