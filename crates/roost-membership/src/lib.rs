//! Roost membership state.
//!
//! The single ground truth for "who is alive": per-tier membership tables
//! with heartbeat expiry, and the handler pool that binds drones to free
//! handlers. Pure in-memory state; the routers own and drive it.

pub mod allocator;
pub mod table;

pub use allocator::HandlerPool;
pub use table::{Member, MemberRole, MemberState, MembershipError, MembershipTable};
