//! Wire vocabulary: member requests and manager replies.
//!
//! Both directions are closed tagged variants so an unrecognized kind is a
//! serde decode failure at the edge, not a silently dropped dictionary key.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::identity::MemberId;

/// A message from a member to a manager tier.
///
/// Wire form: `{"msg_type": "register", "id": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "msg_type", rename_all = "snake_case")]
pub enum Request {
    /// Sent exactly once at agent startup.
    Register { id: MemberId },
    /// Periodic heartbeat; keeps the membership entry alive.
    Ping { id: MemberId },
}

impl Request {
    /// The identity the sender claims in the payload body.
    pub fn member_id(&self) -> &MemberId {
        match self {
            Request::Register { id } => id,
            Request::Ping { id } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Request::Register { .. } => "register",
            Request::Ping { .. } => "ping",
        }
    }

    /// Decode a request off the wire, rejecting empty identities.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProtocolError> {
        let req: Request = serde_json::from_value(value)?;
        if req.member_id().as_str().is_empty() {
            return Err(ProtocolError::InvalidAddress("empty id".to_string()));
        }
        Ok(req)
    }
}

/// A manager reply to a member.
///
/// Wire form: `{"reply": "pong"}`, `{"reply": "assigned", "handler": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Reply {
    /// Handler-tier registration accepted.
    Registered,
    /// The identity already holds a live membership entry.
    AlreadyRegistered,
    /// Drone-tier registration accepted and bound to `handler`.
    Assigned { handler: MemberId },
    /// No free handler; the drone must disconnect.
    NoneAvail,
    /// Heartbeat acknowledged.
    Pong,
}

impl Reply {
    /// True when the member agent must stop on this reply.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Reply::NoneAvail)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_value(value)?)
    }
}
