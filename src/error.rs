use thiserror::Error;

use crate::api::ApiError;
use crate::models::DeliveryStatus;
use crate::validation::ValidationErrors;

#[derive(Error, Debug)]
pub enum TutorError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("percentage {value} is outside the range 0..=100")]
    PercentageOutOfRange { value: i64 },

    #[error("study time cannot be negative (got {duration_ms}ms)")]
    NegativeDuration { duration_ms: i64 },

    #[error("track '{0}' is not enrolled")]
    TrackNotFound(String),

    #[error("message '{0}' not found")]
    MessageNotFound(String),

    #[error("message cannot move from {from} to {to}")]
    InvalidTransition {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },

    #[error("not enough history to predict completion of track '{0}'")]
    InsufficientData(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub type Result<T> = std::result::Result<T, TutorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_error_names_the_value() {
        let err = TutorError::PercentageOutOfRange { value: 150 };
        assert_eq!(err.to_string(), "percentage 150 is outside the range 0..=100");
    }

    #[test]
    fn transition_error_uses_status_names() {
        let err = TutorError::InvalidTransition {
            from: DeliveryStatus::Sent,
            to: DeliveryStatus::Pending,
        };
        assert_eq!(err.to_string(), "message cannot move from sent to pending");
    }

    #[test]
    fn api_errors_pass_through() {
        let err: TutorError = ApiError::RateLimited.into();
        assert_eq!(err.to_string(), ApiError::RateLimited.to_string());
    }
}
