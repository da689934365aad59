//! Per-tier membership table with heartbeat expiry.
//!
//! One instance per tier, owned exclusively by that tier's router. Keeps a
//! registration-ordered index next to the id map so sweeps and logs are
//! deterministic.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use roost_protocol::MemberId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MembershipError {
    #[error("member {0} is already registered")]
    AlreadyRegistered(MemberId),

    #[error("member {0} is not registered")]
    NotFound(MemberId),
}

/// Which tier a member belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Handler,
    Drone,
}

/// Lifecycle state of a live member. Eviction removes the entry outright,
/// so a registered entry is the only live state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberState {
    Registered,
}

/// A live member of one tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub role: MemberRole,
    pub state: MemberState,
    pub registered_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// In-memory map from member identity to liveness metadata.
///
/// Identities are unique keys; a duplicate registration is rejected, never
/// overwritten. Iteration follows registration order.
#[derive(Debug)]
pub struct MembershipTable {
    role: MemberRole,
    /// Registration order; drives `iter()` and the eviction sweep order.
    index: Vec<MemberId>,
    members: HashMap<MemberId, Member>,
}

impl MembershipTable {
    pub fn new(role: MemberRole) -> Self {
        Self {
            role,
            index: Vec::new(),
            members: HashMap::new(),
        }
    }

    pub fn role(&self) -> MemberRole {
        self.role
    }

    /// Insert a new member with `last_seen = now`.
    pub fn register(&mut self, id: MemberId) -> Result<(), MembershipError> {
        self.register_at(id, Utc::now())
    }

    pub fn register_at(&mut self, id: MemberId, now: DateTime<Utc>) -> Result<(), MembershipError> {
        if self.members.contains_key(&id) {
            return Err(MembershipError::AlreadyRegistered(id));
        }
        self.index.push(id.clone());
        self.members.insert(
            id.clone(),
            Member {
                id,
                role: self.role,
                state: MemberState::Registered,
                registered_at: now,
                last_seen: now,
            },
        );
        Ok(())
    }

    /// Refresh `last_seen` for an existing member. A ping from an unknown
    /// identity must not auto-register it.
    pub fn renew(&mut self, id: &MemberId) -> Result<(), MembershipError> {
        self.renew_at(id, Utc::now())
    }

    pub fn renew_at(&mut self, id: &MemberId, now: DateTime<Utc>) -> Result<(), MembershipError> {
        match self.members.get_mut(id) {
            Some(member) => {
                member.last_seen = now;
                tracing::debug!(id = %id, "member renewed");
                Ok(())
            }
            None => Err(MembershipError::NotFound(id.clone())),
        }
    }

    /// Remove every member unseen for `timeout` or longer; returns the
    /// evicted ids in registration order so callers can cascade.
    pub fn expire(&mut self, timeout: Duration) -> Vec<MemberId> {
        self.expire_at(timeout, Utc::now())
    }

    pub fn expire_at(&mut self, timeout: Duration, now: DateTime<Utc>) -> Vec<MemberId> {
        let members = &self.members;
        let mut evicted = Vec::new();
        self.index.retain(|id| {
            let stale = members
                .get(id)
                .map(|m| now - m.last_seen >= timeout)
                .unwrap_or(true);
            if stale {
                evicted.push(id.clone());
            }
            !stale
        });
        for id in &evicted {
            self.members.remove(id);
        }
        evicted
    }

    pub fn count(&self) -> usize {
        self.index.len()
    }

    pub fn contains(&self, id: &MemberId) -> bool {
        self.members.contains_key(id)
    }

    pub fn get(&self, id: &MemberId) -> Option<&Member> {
        self.members.get(id)
    }

    /// Members in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.index.iter().filter_map(|id| self.members.get(id))
    }
}
