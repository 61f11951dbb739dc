// Autoscaler defaults (no magic values in adapters)
use std::time::Duration;

/// Default minimum number of consumers
pub const DEFAULT_MIN_CONSUMERS: u32 = 1;

/// Default maximum number of consumers
pub const DEFAULT_MAX_CONSUMERS: u32 = 10;

/// Default backlog per consumer before scaling up
/// Also passed to workers as `--messages`
pub const DEFAULT_MESSAGES_PER_CONSUMER: u32 = 10;

/// Default pause between two polls (10s)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default iteration limit (0 = unbounded)
pub const DEFAULT_MAX_ITERATIONS: u64 = 0;
