// Port Layer - Interfaces for external collaborators

pub mod policy_source;
pub mod process_launcher;
pub mod queue_inspector;

// Re-exports
pub use policy_source::PolicySource;
pub use process_launcher::{LaunchError, LaunchOutcome, ProcessLauncher};
pub use queue_inspector::{InspectError, QueueInspector};
