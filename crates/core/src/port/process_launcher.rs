// Process Launcher Port
// Abstraction for starting detached worker processes

use crate::domain::CommandLine;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Result of a successful launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LaunchOutcome {
    /// Process id, when the platform reports one
    pub pid: Option<u32>,
}

/// Launch errors
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Failed to launch `{command}`: {source}")]
    LaunchFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot open log destination {}: {source}", path.display())]
    LogDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Process Launcher trait
///
/// Implementations:
/// - DetachedProcessLauncher: spawns the worker in its own process group
///
/// Launches are fire-and-forget: the implementation must not wait for the
/// worker to exit.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start one worker
    ///
    /// # Errors
    /// - LaunchError::LogDestination if the output file cannot be opened
    /// - LaunchError::LaunchFailed if the process cannot be started
    async fn launch(&self, command: &CommandLine) -> Result<LaunchOutcome, LaunchError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock launcher behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed, handing out increasing pids
        Success,
        /// Always fail with the given OS error kind
        Fail(std::io::ErrorKind),
        /// Fail only on the listed (1-based) calls
        FailOn(Vec<usize>),
    }

    /// Mock Process Launcher recording every command it was asked to start
    pub struct MockProcessLauncher {
        behavior: Arc<Mutex<MockBehavior>>,
        launched: Arc<Mutex<Vec<CommandLine>>>,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockProcessLauncher {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                launched: Arc::new(Mutex::new(Vec::new())),
                call_count: Arc::new(Mutex::new(0)),
            }
        }
        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }
        pub fn new_fail() -> Self {
            Self::new(MockBehavior::Fail(std::io::ErrorKind::NotFound))
        }
        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
        /// Commands that were started successfully
        pub fn launched(&self) -> Vec<CommandLine> {
            self.launched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessLauncher for MockProcessLauncher {
        async fn launch(&self, command: &CommandLine) -> Result<LaunchOutcome, LaunchError> {
            let call = {
                let mut count = self.call_count.lock().unwrap();
                *count += 1;
                *count
            };

            let behavior = self.behavior.lock().unwrap().clone();
            let failure = match behavior {
                MockBehavior::Success => None,
                MockBehavior::Fail(kind) => Some(kind),
                MockBehavior::FailOn(calls) => calls
                    .contains(&call)
                    .then_some(std::io::ErrorKind::PermissionDenied),
            };

            if let Some(kind) = failure {
                return Err(LaunchError::LaunchFailed {
                    command: command.to_string(),
                    source: std::io::Error::from(kind),
                });
            }

            self.launched.lock().unwrap().push(command.clone());
            Ok(LaunchOutcome {
                pid: Some(10_000 + call as u32),
            })
        }
    }
}
