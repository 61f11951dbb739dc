// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
///
/// Launch failures are not part of this taxonomy: the loop logs and skips
/// them (see `port::LaunchError`).
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No queue options configured for consumer '{0}'")]
    MissingQueueOptions(String),

    #[error("Queue unavailable: {0}")]
    QueueUnavailable(#[from] crate::port::InspectError),
}

impl AppError {
    /// Errors that must stop the process before the loop begins
    pub fn is_configuration(&self) -> bool {
        matches!(self, AppError::Config(_) | AppError::MissingQueueOptions(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Policy invariant violations are configuration errors
impl From<crate::domain::DomainError> for AppError {
    fn from(err: crate::domain::DomainError) -> Self {
        AppError::Config(err.to_string())
    }
}
