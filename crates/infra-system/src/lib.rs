// mqscaler Infrastructure - System Adapters
// Implements: ProcessLauncher

pub mod detached_launcher;

pub use detached_launcher::DetachedProcessLauncher;
