// Queue Domain Model

use serde::{Deserialize, Serialize};

/// Default broker virtual host
pub const DEFAULT_VHOST: &str = "/";

/// Identity of a monitored queue and the consumer that serves it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueIdentity {
    /// Consumer name, passed verbatim to every launched worker
    pub consumer: String,
    /// Queue name on the broker
    pub queue: String,
    /// Broker virtual host
    pub vhost: String,
}

impl QueueIdentity {
    pub fn new(consumer: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            consumer: consumer.into(),
            queue: queue.into(),
            vhost: DEFAULT_VHOST.to_string(),
        }
    }

    pub fn with_vhost(mut self, vhost: impl Into<String>) -> Self {
        self.vhost = vhost.into();
        self
    }
}

impl std::fmt::Display for QueueIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.vhost.trim_end_matches('/'), self.queue)
    }
}

/// Point-in-time snapshot of a queue, read fresh on every poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueState {
    pub pending_messages: u64,
    pub active_consumers: u32,
}

impl QueueState {
    pub fn new(pending_messages: u64, active_consumers: u32) -> Self {
        Self {
            pending_messages,
            active_consumers,
        }
    }
}
