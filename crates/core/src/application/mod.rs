// Application Layer - Use Cases and Business Logic

pub mod autoscaler;

// Re-exports
pub use autoscaler::{Autoscaler, IterationReport, RunSummary};
