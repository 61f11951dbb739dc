// Queue Inspector Port
// Reads the current depth and consumer count of a broker queue

use crate::domain::{QueueIdentity, QueueState};
use async_trait::async_trait;
use thiserror::Error;

/// Inspection errors (all surface as `AppError::QueueUnavailable`)
#[derive(Error, Debug)]
pub enum InspectError {
    #[error("Broker unreachable: {0}")]
    Connection(String),

    #[error("Queue not found: {0}")]
    NotFound(String),

    #[error("Invalid broker response: {0}")]
    InvalidResponse(String),
}

/// Queue Inspector trait
///
/// Implementations:
/// - ManagementApiInspector: RabbitMQ management HTTP API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueInspector: Send + Sync {
    /// Read pending messages and active consumers for a queue
    ///
    /// # Errors
    /// - InspectError::Connection if the broker cannot be reached
    /// - InspectError::NotFound if the queue does not exist
    /// - InspectError::InvalidResponse if the broker answer cannot be read
    async fn query_state(&self, queue: &QueueIdentity) -> Result<QueueState, InspectError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Scripted inspector: replays queued states, then repeats the last one
    pub struct ScriptedQueueInspector {
        states: Arc<Mutex<VecDeque<QueueState>>>,
        last: Arc<Mutex<QueueState>>,
        fail_after: Option<usize>,
        call_count: Arc<Mutex<usize>>,
    }

    impl ScriptedQueueInspector {
        pub fn new(states: impl IntoIterator<Item = QueueState>) -> Self {
            Self {
                states: Arc::new(Mutex::new(states.into_iter().collect())),
                last: Arc::new(Mutex::new(QueueState::default())),
                fail_after: None,
                call_count: Arc::new(Mutex::new(0)),
            }
        }
        /// Always report the same state
        pub fn constant(state: QueueState) -> Self {
            Self::new([state])
        }
        /// Fail with `Connection` once `calls` successful reads were served
        pub fn failing_after(mut self, calls: usize) -> Self {
            self.fail_after = Some(calls);
            self
        }
        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl QueueInspector for ScriptedQueueInspector {
        async fn query_state(&self, queue: &QueueIdentity) -> Result<QueueState, InspectError> {
            let call = {
                let mut count = self.call_count.lock().unwrap();
                *count += 1;
                *count
            };

            if matches!(self.fail_after, Some(limit) if call > limit) {
                return Err(InspectError::Connection(format!(
                    "scripted failure reading {}",
                    queue
                )));
            }

            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.states.lock().unwrap().pop_front() {
                *last = next;
            }
            Ok(*last)
        }
    }
}
