//! The membership router: one per tier.
//!
//! Poll loop contract: every wake runs the expiry sweep BEFORE the cycle's
//! message is processed, so fresh traffic from an identity always beats its
//! own eviction in the same cycle, and a member that reconnects right after
//! expiring is a fresh registration.

use std::time::Duration;

use chrono::{DateTime, Utc};

use roost_membership::{MembershipError, MembershipTable};
use roost_protocol::{MemberId, Reply, Request};
use roost_transport::RoutedListener;

use crate::policy::TierPolicy;

pub struct MembershipRouter<P: TierPolicy> {
    table: MembershipTable,
    policy: P,
    eviction_timeout: chrono::Duration,
    poll_interval: Duration,
}

impl<P: TierPolicy> MembershipRouter<P> {
    pub fn new(
        table: MembershipTable,
        policy: P,
        eviction_timeout_secs: u64,
        poll_interval_ms: u64,
    ) -> Self {
        Self {
            table,
            policy,
            eviction_timeout: chrono::Duration::seconds(eviction_timeout_secs as i64),
            poll_interval: Duration::from_millis(poll_interval_ms),
        }
    }

    pub fn table(&self) -> &MembershipTable {
        &self.table
    }

    /// Evict everything stale and let the tier react (handler evictions
    /// cascade into the pool, drone evictions free their binding).
    pub fn sweep(&mut self) -> Vec<MemberId> {
        self.sweep_at(Utc::now())
    }

    pub fn sweep_at(&mut self, now: DateTime<Utc>) -> Vec<MemberId> {
        let evicted = self.table.expire_at(self.eviction_timeout, now);
        if !evicted.is_empty() {
            for id in &evicted {
                tracing::info!(
                    tier = self.policy.tier_name(),
                    id = %id,
                    timeout_secs = self.eviction_timeout.num_seconds(),
                    members = self.table.count(),
                    "no heartbeat received, dropping member"
                );
            }
            self.policy.on_expired(&evicted);
        }
        evicted
    }

    /// Dispatch one decoded request. Every reply is addressed to `from`;
    /// the payload id is informational and loses on mismatch.
    pub fn handle(&mut self, from: &MemberId, request: Request) -> Option<Reply> {
        self.handle_at(from, request, Utc::now())
    }

    pub fn handle_at(
        &mut self,
        from: &MemberId,
        request: Request,
        now: DateTime<Utc>,
    ) -> Option<Reply> {
        if request.member_id() != from {
            tracing::warn!(
                tier = self.policy.tier_name(),
                from = %from,
                claimed = %request.member_id(),
                kind = request.kind(),
                "payload id differs from sender address, using the address"
            );
        }
        match request {
            Request::Register { .. } => match self.table.register_at(from.clone(), now) {
                Ok(()) => {
                    let reply = self.policy.on_register(from);
                    tracing::info!(
                        tier = self.policy.tier_name(),
                        id = %from,
                        members = self.table.count(),
                        "member registered"
                    );
                    Some(reply)
                }
                Err(MembershipError::AlreadyRegistered(_)) => {
                    tracing::debug!(
                        tier = self.policy.tier_name(),
                        id = %from,
                        "duplicate registration rejected"
                    );
                    Some(Reply::AlreadyRegistered)
                }
                Err(MembershipError::NotFound(_)) => None,
            },
            Request::Ping { .. } => {
                if let Err(MembershipError::NotFound(_)) = self.table.renew_at(from, now) {
                    // A ping never registers anyone; the sender will learn
                    // nothing until it re-registers.
                    tracing::debug!(
                        tier = self.policy.tier_name(),
                        id = %from,
                        "ping from unknown member"
                    );
                }
                Some(Reply::Pong)
            }
        }
    }

    /// Serve the tier endpoint until the process stops: sweep, poll, decode,
    /// dispatch, reply. Malformed payloads and failed sends are dropped;
    /// retries are the member's own ping cadence.
    pub async fn run(mut self, mut listener: RoutedListener) {
        tracing::info!(
            tier = self.policy.tier_name(),
            addr = %listener.local_addr(),
            "tier router listening"
        );
        loop {
            self.sweep();
            let Some((from, payload)) = listener.poll(self.poll_interval).await else {
                continue;
            };
            let request = match Request::from_value(payload) {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!(
                        tier = self.policy.tier_name(),
                        from = %from,
                        error = %e,
                        "unexpected message, ignoring"
                    );
                    continue;
                }
            };
            if let Some(reply) = self.handle(&from, request) {
                if let Err(e) = listener.send_to(&from, &reply) {
                    tracing::warn!(
                        tier = self.policy.tier_name(),
                        to = %from,
                        error = %e,
                        "reply not delivered"
                    );
                }
            }
        }
    }
}
