//! Handler pool: binds each newly registered drone to a free handler.
//!
//! Greedy and non-preemptive: once bound, a drone keeps its handler until
//! either side is evicted. No rebalancing, no retry of orphaned drones.

use std::collections::HashMap;

use roost_protocol::MemberId;

/// Registration-ordered pool of handlers plus the drone → handler bindings.
///
/// Shared by both tier routers (the handler tier feeds it registrations and
/// evictions, the drone tier draws assignments), so callers wrap it in a
/// single `Arc<Mutex<_>>`.
#[derive(Debug, Default)]
pub struct HandlerPool {
    /// Handlers in registration order. Selection takes the tail-most
    /// unassigned entry, i.e. the most recently registered free handler.
    handlers: Vec<MemberId>,
    /// drone id → handler id. One handler may appear as the value of many
    /// drones; each drone has at most one entry.
    assignments: HashMap<MemberId, MemberId>,
}

impl HandlerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a handler the handler tier just accepted.
    pub fn handler_registered(&mut self, id: MemberId) {
        if !self.handlers.contains(&id) {
            self.handlers.push(id);
        }
    }

    /// Handlers minus distinct assigned handlers. Never negative: every
    /// assignment value is kept inside the handler list.
    pub fn free_handler_count(&self) -> usize {
        let assigned = self
            .handlers
            .iter()
            .filter(|h| self.assignments.values().any(|a| a == *h))
            .count();
        self.handlers.len() - assigned
    }

    /// Bind `drone_id` to a free handler, most recently registered first.
    /// Returns `None` with no mutation when capacity is exhausted. A drone
    /// that already holds a binding gets it back unchanged.
    pub fn assign(&mut self, drone_id: &MemberId) -> Option<MemberId> {
        if let Some(existing) = self.assignments.get(drone_id) {
            return Some(existing.clone());
        }
        let handler = self
            .handlers
            .iter()
            .rev()
            .find(|h| !self.assignments.values().any(|a| a == *h))
            .cloned()?;
        self.assignments.insert(drone_id.clone(), handler.clone());
        tracing::debug!(drone = %drone_id, handler = %handler, "drone assigned");
        Some(handler)
    }

    /// Drop an evicted handler and every binding to it. Returns the orphaned
    /// drone ids; they are not re-assigned here, their bindings are simply
    /// gone.
    pub fn unassign_handler(&mut self, handler_id: &MemberId) -> Vec<MemberId> {
        self.handlers.retain(|h| h != handler_id);
        let orphaned: Vec<MemberId> = self
            .assignments
            .iter()
            .filter(|(_, h)| *h == handler_id)
            .map(|(d, _)| d.clone())
            .collect();
        for drone in &orphaned {
            self.assignments.remove(drone);
        }
        orphaned
    }

    /// Drop an evicted drone's binding, if it has one.
    pub fn unassign_drone(&mut self, drone_id: &MemberId) {
        self.assignments.remove(drone_id);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn assignment_for(&self, drone_id: &MemberId) -> Option<&MemberId> {
        self.assignments.get(drone_id)
    }
}
