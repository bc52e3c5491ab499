// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unknown target type: {0}")]
    UnknownTargetType(String),

    #[error("Unknown metric type: {0} (expected 'rank' or 'best')")]
    UnknownMetricType(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
