// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("min_consumers ({min}) must not exceed max_consumers ({max})")]
    ConsumerBounds { min: u32, max: u32 },

    #[error("messages per consumer threshold must be positive")]
    ZeroThreshold,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
