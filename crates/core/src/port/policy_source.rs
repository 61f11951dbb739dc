// Configuration Source Port

use crate::domain::ScalingPolicy;
use crate::error::Result;

/// Supplies the configured scaling policy for a consumer
pub trait PolicySource: Send + Sync {
    /// Resolve the policy registered for `consumer`
    ///
    /// # Errors
    /// - AppError::MissingQueueOptions if nothing is registered for the name
    fn resolve_policy(&self, consumer: &str) -> Result<ScalingPolicy>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;

    /// In-memory policy source keyed by consumer name
    #[derive(Default)]
    pub struct StaticPolicySource {
        policies: HashMap<String, ScalingPolicy>,
    }

    impl StaticPolicySource {
        pub fn new() -> Self {
            Self::default()
        }
        pub fn with_policy(mut self, policy: ScalingPolicy) -> Self {
            self.policies.insert(policy.queue.consumer.clone(), policy);
            self
        }
    }

    impl PolicySource for StaticPolicySource {
        fn resolve_policy(&self, consumer: &str) -> Result<ScalingPolicy> {
            self.policies
                .get(consumer)
                .cloned()
                .ok_or_else(|| AppError::MissingQueueOptions(consumer.to_string()))
        }
    }
}
