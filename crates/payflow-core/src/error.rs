//! # Checkout Error Types
//!
//! Infrastructure errors for the payflow engine.
//!
//! These never reach the user as payment results: declines, expired cards and
//! transport failures are modelled by [`crate::outcome::SubmissionOutcome`].
//! `CheckoutError` covers the things that are wrong with a *request* or with
//! the environment (bad config, unknown plan, store failure, double submit).

use thiserror::Error;

/// Core error type for engine operations
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Configuration errors (bad env value, unreadable catalog)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Field name not part of the selected payment method
    #[error("Unknown field '{field}' for {kind} payment method")]
    UnknownField { kind: String, field: String },

    /// Plan not found in the catalog
    #[error("Plan not found: {plan_id}")]
    UnknownPlan { plan_id: String },

    /// Record not found in the store
    #[error("Record not found: {id}")]
    RecordNotFound { id: String },

    /// A submission for this form is already in flight
    #[error("A submission is already in progress for this form")]
    SubmissionInProgress,

    /// The form already completed successfully
    #[error("This form has already been submitted successfully")]
    AlreadySubmitted,

    /// Record store failure
    #[error("Record store error: {0}")]
    Store(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CheckoutError {
    /// Returns true if retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckoutError::SubmissionInProgress | CheckoutError::Store(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CheckoutError::Configuration(_) => 500,
            CheckoutError::InvalidRequest(_) => 400,
            CheckoutError::UnknownField { .. } => 400,
            CheckoutError::UnknownPlan { .. } => 404,
            CheckoutError::RecordNotFound { .. } => 404,
            CheckoutError::SubmissionInProgress => 409,
            CheckoutError::AlreadySubmitted => 409,
            CheckoutError::Store(_) => 503,
            CheckoutError::Internal(_) => 500,
            CheckoutError::Serialization(_) => 400,
        }
    }
}

impl From<serde_json::Error> for CheckoutError {
    fn from(err: serde_json::Error) -> Self {
        CheckoutError::Serialization(err.to_string())
    }
}

/// Result type alias for engine operations
pub type CheckoutResult<T> = Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(CheckoutError::SubmissionInProgress.is_retryable());
        assert!(CheckoutError::Store("locked".into()).is_retryable());
        assert!(!CheckoutError::InvalidRequest("bad data".into()).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CheckoutError::InvalidRequest("test".into()).status_code(), 400);
        assert_eq!(
            CheckoutError::UnknownPlan {
                plan_id: "x".into()
            }
            .status_code(),
            404
        );
        assert_eq!(CheckoutError::SubmissionInProgress.status_code(), 409);
    }

    #[test]
    fn test_unknown_field_message() {
        let err = CheckoutError::UnknownField {
            kind: "card_debit".into(),
            field: "iban".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown field 'iban' for card_debit payment method"
        );
    }
}
