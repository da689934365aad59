//! Length-prefixed JSON frames.
//!
//! Every frame is a u32 little-endian byte length followed by a JSON
//! document. Member-to-manager frames carry an [`Envelope`] tagging the
//! payload with the sender's identity; manager replies are the bare payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use roost_protocol::MemberId;

use crate::TransportError;

/// Upper bound on a single frame's JSON body.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// The routed-socket addressing wrapper: who sent this payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub from: MemberId,
    pub payload: Value,
}

/// Write one frame. Errors when the encoded body exceeds [`MAX_FRAME_LEN`].
pub async fn write_frame<W, T>(writer: &mut W, body: &T) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = serde_json::to_vec(body)?;
    if bytes.len() > MAX_FRAME_LEN {
        return Err(TransportError::Frame(format!(
            "frame of {} bytes exceeds the {} byte limit",
            bytes.len(),
            MAX_FRAME_LEN
        )));
    }
    writer.write_all(&(bytes.len() as u32).to_le_bytes()).await?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame. `Ok(None)` is a clean close at a frame boundary.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Value>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::Frame(format!(
            "declared frame length {len} exceeds the {MAX_FRAME_LEN} byte limit"
        )));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    let value = serde_json::from_slice(&body)
        .map_err(|e| TransportError::Frame(format!("frame body is not JSON: {e}")))?;
    Ok(Some(value))
}
