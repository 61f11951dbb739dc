// Domain Layer - Pure scaling logic and value types

pub mod decision;
pub mod error;
pub mod launch;
pub mod policy;
pub mod queue;

// Re-exports
pub use decision::{decide, ScaleDecision};
pub use error::DomainError;
pub use launch::{CommandLine, LaunchRecord, LaunchSpec};
pub use policy::{PolicyOverrides, ScalingPolicy};
pub use queue::{QueueIdentity, QueueState};
