// Scaling Policy Domain Model

use super::error::{DomainError, Result};
use super::launch::LaunchSpec;
use super::queue::QueueIdentity;
use std::path::PathBuf;
use std::time::Duration;

/// Static scaling configuration for one monitored queue
///
/// Resolved once at startup (configured values merged with CLI overrides)
/// and never mutated while the loop runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingPolicy {
    pub queue: QueueIdentity,
    pub min_consumers: u32,
    pub max_consumers: u32,
    /// Backlog each active consumer is expected to absorb
    pub messages_per_consumer: u32,
    pub poll_interval: Duration,
    /// 0 = run until the process is stopped
    pub max_iterations: u64,
    pub launch_spec: LaunchSpec,
    pub debug: bool,
}

impl ScalingPolicy {
    /// Check the policy invariants
    ///
    /// # Errors
    /// - `DomainError::ConsumerBounds` if `min_consumers > max_consumers`
    /// - `DomainError::ZeroThreshold` if `messages_per_consumer == 0`
    pub fn validate(&self) -> Result<()> {
        if self.min_consumers > self.max_consumers {
            return Err(DomainError::ConsumerBounds {
                min: self.min_consumers,
                max: self.max_consumers,
            });
        }
        if self.messages_per_consumer == 0 {
            return Err(DomainError::ZeroThreshold);
        }
        if self.launch_spec.program.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "worker program must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the loop stops on its own after `max_iterations` polls
    pub fn is_bounded(&self) -> bool {
        self.max_iterations > 0
    }

    /// Apply command-line overrides on top of the configured values
    pub fn with_overrides(mut self, overrides: &PolicyOverrides) -> Self {
        if let Some(min) = overrides.min_consumers {
            self.min_consumers = min;
        }
        if let Some(max) = overrides.max_consumers {
            self.max_consumers = max;
        }
        if let Some(messages) = overrides.messages {
            self.messages_per_consumer = messages;
            self.launch_spec.messages = messages;
        }
        if let Some(interval) = overrides.poll_interval {
            self.poll_interval = interval;
        }
        if let Some(iterations) = overrides.max_iterations {
            self.max_iterations = iterations;
        }
        if let Some(subcommand) = &overrides.subcommand {
            self.launch_spec.subcommand = subcommand.clone();
        }
        if let Some(prefix) = &overrides.prefix {
            self.launch_spec.prefix = prefix.clone();
        }
        if let Some(log) = &overrides.log_destination {
            self.launch_spec.log_destination = log.clone();
        }
        if let Some(route) = &overrides.route {
            self.launch_spec.route = route.clone();
        }
        if let Some(limit) = overrides.memory_limit {
            self.launch_spec.memory_limit = Some(limit);
        }
        if let Some(without_signals) = overrides.without_signals {
            self.launch_spec.without_signals = without_signals;
        }
        if let Some(debug) = overrides.debug {
            self.debug = debug;
            self.launch_spec.worker_debug = debug;
        }
        self
    }
}

/// Optional values supplied on the command line
///
/// `None` means "keep the configured value".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyOverrides {
    pub min_consumers: Option<u32>,
    pub max_consumers: Option<u32>,
    pub messages: Option<u32>,
    pub poll_interval: Option<Duration>,
    pub max_iterations: Option<u64>,
    pub subcommand: Option<String>,
    pub prefix: Option<Vec<String>>,
    pub log_destination: Option<PathBuf>,
    pub route: Option<String>,
    pub memory_limit: Option<u32>,
    pub without_signals: Option<bool>,
    pub debug: Option<bool>,
}
