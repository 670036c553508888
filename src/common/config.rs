use std::time::Duration;

pub type Address = u64; // backend address type; meaning is defined by the backend

/// Max pending requests before a batch is force-flushed.
pub const DEFAULT_PENDING_LIMIT: usize = 32;

/// Suggested per-request deadline for callers without a latency budget of
/// their own.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(500);
