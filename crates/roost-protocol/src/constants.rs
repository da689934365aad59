//! Protocol cadence constants shared by managers and member agents.

/// A member with no heartbeat for this long is evicted from its tier.
pub const EVICTION_TIMEOUT_SECS: u64 = 10;

/// Bounded wait of the router poll loop; the sweep cadence with no traffic.
pub const ROUTER_POLL_INTERVAL_MS: u64 = 100;

/// Interval between member heartbeats. Must stay under
/// `EVICTION_TIMEOUT_SECS` with room for one lost round trip, or members
/// get evicted spuriously.
pub const PING_INTERVAL_SECS: u64 = 3;

/// How long an agent waits for a reply before polling again.
pub const REPLY_WAIT_TIMEOUT_SECS: u64 = 5;
