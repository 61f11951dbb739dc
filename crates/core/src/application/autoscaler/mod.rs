// Autoscaler - Polling control loop for one queue

pub mod constants;

use crate::domain::{decide, CommandLine, LaunchRecord, QueueState, ScaleDecision, ScalingPolicy};
use crate::error::Result;
use crate::port::{ProcessLauncher, QueueInspector};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// What a single poll observed and did
#[derive(Debug, Clone)]
pub struct IterationReport {
    pub iteration: u64,
    pub state: QueueState,
    pub decision: ScaleDecision,
    pub launched: Vec<LaunchRecord>,
    pub failed: u32,
}

/// Totals of a bounded run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub iterations: u64,
    pub launched: u64,
    pub failed_launches: u64,
}

/// Autoscaler polls a queue and launches workers under a threshold policy
///
/// One poll/decide/launch/sleep cycle completes before the next starts.
/// There is no cancellation check inside the loop: an unbounded run only
/// ends when the future is dropped or the process is stopped.
pub struct Autoscaler {
    policy: ScalingPolicy,
    command: CommandLine,
    inspector: Arc<dyn QueueInspector>,
    launcher: Arc<dyn ProcessLauncher>,
}

impl Autoscaler {
    /// Create an autoscaler for a resolved policy
    ///
    /// The worker command line is rendered here once and reused for every
    /// launch.
    ///
    /// # Errors
    /// - AppError::Config if the policy violates its invariants
    pub fn new(
        policy: ScalingPolicy,
        inspector: Arc<dyn QueueInspector>,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Result<Self> {
        policy.validate()?;
        let command = policy.launch_spec.render();

        info!(
            queue = %policy.queue,
            consumer = %policy.queue.consumer,
            min = policy.min_consumers,
            max = policy.max_consumers,
            messages_per_consumer = policy.messages_per_consumer,
            interval_ms = policy.poll_interval.as_millis() as u64,
            max_iterations = policy.max_iterations,
            "Autoscaler configured"
        );

        Ok(Self {
            policy,
            command,
            inspector,
            launcher,
        })
    }

    pub fn policy(&self) -> &ScalingPolicy {
        &self.policy
    }

    /// Command line used for every worker
    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    /// Run the loop
    ///
    /// Returns after `max_iterations` polls when the policy is bounded,
    /// without sleeping after the last one. Unbounded runs never return
    /// `Ok`.
    ///
    /// # Errors
    /// - AppError::QueueUnavailable as soon as a queue read fails
    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut iteration: u64 = 1;

        loop {
            let report = self.run_iteration(iteration).await?;

            summary.iterations = iteration;
            summary.launched += report.launched.len() as u64;
            summary.failed_launches += u64::from(report.failed);

            if self.policy.is_bounded() && iteration == self.policy.max_iterations {
                info!(
                    iterations = summary.iterations,
                    launched = summary.launched,
                    failed_launches = summary.failed_launches,
                    "Iteration limit reached, stopping"
                );
                return Ok(summary);
            }

            iteration += 1;
            sleep(self.policy.poll_interval).await;
        }
    }

    /// Poll once, decide, and launch the missing workers
    ///
    /// # Errors
    /// - AppError::QueueUnavailable if the queue cannot be read; nothing is
    ///   launched in that case
    pub async fn run_iteration(&self, iteration: u64) -> Result<IterationReport> {
        let state = self.inspector.query_state(&self.policy.queue).await?;

        debug!(
            iteration,
            consumers = state.active_consumers,
            messages = state.pending_messages,
            "{} consumers, {} messages",
            state.active_consumers,
            state.pending_messages
        );

        let decision = decide(&self.policy, &state);
        if let Some(reason) = decision.reason() {
            info!(
                iteration,
                reason,
                consumers = state.active_consumers,
                messages = state.pending_messages,
                adding = decision.count(),
                "Scaling up: {}",
                reason
            );
        }

        let (launched, failed) = self.launch_workers(decision.count()).await;

        Ok(IterationReport {
            iteration,
            state,
            decision,
            launched,
            failed,
        })
    }

    /// Launch `count` workers back-to-back; failures are logged and skipped
    async fn launch_workers(&self, count: u32) -> (Vec<LaunchRecord>, u32) {
        let mut launched = Vec::new();
        let mut failed = 0;

        for _ in 0..count {
            match self.launcher.launch(&self.command).await {
                Ok(outcome) => {
                    let record = LaunchRecord::new(
                        &self.command,
                        outcome.pid,
                        chrono::Utc::now().timestamp_millis(),
                    );
                    if self.policy.debug {
                        info!(pid = ?record.pid, cmd = %record.command, "Worker launched");
                    } else {
                        debug!(pid = ?record.pid, "Worker launched");
                    }
                    launched.push(record);
                }
                Err(e) => {
                    failed += 1;
                    warn!(error = %e, "Worker launch failed, continuing");
                }
            }
        }

        (launched, failed)
    }
}
