// mqscaler Infrastructure - Broker Adapters
// Implements: QueueInspector

pub mod management_api;

pub use management_api::{ManagementApiConfig, ManagementApiInspector};
