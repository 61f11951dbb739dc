// Scaling decision - pure function of the policy and the latest queue state

use super::policy::ScalingPolicy;
use super::queue::QueueState;

/// What one poll decided to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    /// Nothing to launch
    Hold,
    /// Backlog with no consumer at all: start `max(1, min_consumers)`
    Bootstrap(u32),
    /// Backlog above threshold: top up to `max_consumers` in one step
    TopUp(u32),
    /// Fewer consumers than the configured floor
    RestoreFloor(u32),
}

impl ScaleDecision {
    /// Number of workers to launch for this decision
    pub fn count(&self) -> u32 {
        match self {
            ScaleDecision::Hold => 0,
            ScaleDecision::Bootstrap(n)
            | ScaleDecision::TopUp(n)
            | ScaleDecision::RestoreFloor(n) => *n,
        }
    }

    /// Human readable reason, `None` when holding
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            ScaleDecision::Hold => None,
            ScaleDecision::Bootstrap(_) | ScaleDecision::TopUp(_) => Some("not enough consumers"),
            ScaleDecision::RestoreFloor(_) => Some("below minimum"),
        }
    }
}

/// Decide how many consumers to add
///
/// The backlog rule takes priority; the floor rule is only evaluated when
/// the backlog rule does not fire.
pub fn decide(policy: &ScalingPolicy, state: &QueueState) -> ScaleDecision {
    let threshold = u64::from(policy.messages_per_consumer) * u64::from(state.active_consumers);

    if state.pending_messages > threshold && state.active_consumers < policy.max_consumers {
        if state.active_consumers == 0 {
            return ScaleDecision::Bootstrap(policy.min_consumers.max(1));
        }
        return ScaleDecision::TopUp(policy.max_consumers - state.active_consumers);
    }

    if state.active_consumers < policy.min_consumers {
        return ScaleDecision::RestoreFloor(policy.min_consumers - state.active_consumers);
    }

    ScaleDecision::Hold
}
