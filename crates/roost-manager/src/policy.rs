//! Per-tier behavior plugged into the generic membership router.

use std::sync::{Arc, Mutex};

use roost_membership::HandlerPool;
use roost_protocol::{MemberId, Reply};

/// The handler pool as shared by both tier routers. Critical sections are
/// short and never held across an await.
pub type SharedPool = Arc<Mutex<HandlerPool>>;

/// What a tier does once the membership table has accepted a registration,
/// and when the sweep evicts members.
pub trait TierPolicy: Send {
    fn tier_name(&self) -> &'static str;

    /// Runs after a successful table insert; produces the reply.
    fn on_register(&self, id: &MemberId) -> Reply;

    /// Runs after the sweep removed `ids` from the table.
    fn on_expired(&self, ids: &[MemberId]);
}

/// Handler-facing tier: accepted handlers join the pool.
pub struct HandlerTier {
    pool: SharedPool,
}

impl HandlerTier {
    pub fn new(pool: SharedPool) -> Self {
        Self { pool }
    }
}

impl TierPolicy for HandlerTier {
    fn tier_name(&self) -> &'static str {
        "handlers"
    }

    fn on_register(&self, id: &MemberId) -> Reply {
        let mut pool = self.pool.lock().expect("handler pool lock poisoned");
        pool.handler_registered(id.clone());
        Reply::Registered
    }

    fn on_expired(&self, ids: &[MemberId]) {
        let mut pool = self.pool.lock().expect("handler pool lock poisoned");
        for id in ids {
            let orphaned = pool.unassign_handler(id);
            if !orphaned.is_empty() {
                tracing::info!(
                    handler = %id,
                    orphaned = orphaned.len(),
                    "evicted handler had assigned drones, bindings dropped"
                );
            }
        }
    }
}

/// Drone-facing tier: accepted drones are bound to a free handler, or told
/// there is none.
pub struct DroneTier {
    pool: SharedPool,
}

impl DroneTier {
    pub fn new(pool: SharedPool) -> Self {
        Self { pool }
    }
}

impl TierPolicy for DroneTier {
    fn tier_name(&self) -> &'static str {
        "drones"
    }

    fn on_register(&self, id: &MemberId) -> Reply {
        let mut pool = self.pool.lock().expect("handler pool lock poisoned");
        match pool.assign(id) {
            Some(handler) => {
                tracing::info!(drone = %id, handler = %handler, "drone bound to handler");
                Reply::Assigned { handler }
            }
            None => {
                tracing::warn!(drone = %id, "no free handler available");
                Reply::NoneAvail
            }
        }
    }

    fn on_expired(&self, ids: &[MemberId]) {
        let mut pool = self.pool.lock().expect("handler pool lock poisoned");
        for id in ids {
            pool.unassign_drone(id);
        }
    }
}

/// Registration-only tier, used by a handler hosting its own drone-facing
/// endpoint: members are tracked and ponged, nothing is allocated.
pub struct RegistrationTier {
    name: &'static str,
}

impl RegistrationTier {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl TierPolicy for RegistrationTier {
    fn tier_name(&self) -> &'static str {
        self.name
    }

    fn on_register(&self, _id: &MemberId) -> Reply {
        Reply::Registered
    }

    fn on_expired(&self, _ids: &[MemberId]) {}
}
