//! # Submission Outcomes
//!
//! The closed result taxonomy the UI sees. Raw gateway responses are
//! classified into these in [`crate::gateway::classify`]; nothing else
//! leaves the engine.

use crate::validate::FieldErrors;
use serde::{Deserialize, Serialize};

/// Result of one submission attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// Funds captured or method registered
    Success(String),
    Declined,
    InsufficientFunds,
    ExpiredCard,
    NetworkError,
    ValidationFailed(FieldErrors),
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Success(_))
    }

    /// Gateway reference of a successful submission
    pub fn reference_id(&self) -> Option<&str> {
        match self {
            SubmissionOutcome::Success(reference) => Some(reference),
            _ => None,
        }
    }

    /// The failure kind, or `None` on success
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            SubmissionOutcome::Success(_) => None,
            SubmissionOutcome::Declined => Some(ErrorKind::Declined),
            SubmissionOutcome::InsufficientFunds => Some(ErrorKind::InsufficientFunds),
            SubmissionOutcome::ExpiredCard => Some(ErrorKind::ExpiredCard),
            SubmissionOutcome::NetworkError => Some(ErrorKind::NetworkError),
            SubmissionOutcome::ValidationFailed(errors) => {
                Some(ErrorKind::ValidationFailed(errors.clone()))
            }
        }
    }
}

impl From<ErrorKind> for SubmissionOutcome {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Declined => SubmissionOutcome::Declined,
            ErrorKind::InsufficientFunds => SubmissionOutcome::InsufficientFunds,
            ErrorKind::ExpiredCard => SubmissionOutcome::ExpiredCard,
            ErrorKind::NetworkError => SubmissionOutcome::NetworkError,
            ErrorKind::ValidationFailed(errors) => SubmissionOutcome::ValidationFailed(errors),
        }
    }
}

/// Why an attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fields", rename_all = "snake_case")]
pub enum ErrorKind {
    Declined,
    InsufficientFunds,
    ExpiredCard,
    NetworkError,
    ValidationFailed(FieldErrors),
}

impl ErrorKind {
    /// What the UI should offer next
    pub fn recovery(&self) -> Recovery {
        match self {
            ErrorKind::Declined | ErrorKind::InsufficientFunds => {
                Recovery::RetryWithDifferentMethod
            }
            ErrorKind::ExpiredCard => Recovery::ReenterCardDetails,
            ErrorKind::NetworkError => Recovery::RetrySameSubmission,
            ErrorKind::ValidationFailed(_) => Recovery::CorrectFields,
        }
    }

    /// Message shown above the form
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::Declined => "Your payment was declined. Please try another payment method.",
            ErrorKind::InsufficientFunds => {
                "Insufficient funds. Please try another payment method."
            }
            ErrorKind::ExpiredCard => "This card has expired. Please check the card details.",
            ErrorKind::NetworkError => "We could not reach the payment service. Please try again.",
            ErrorKind::ValidationFailed(_) => "Please correct the highlighted fields.",
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ErrorKind::ValidationFailed(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Caller action attached to each failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    RetryWithDifferentMethod,
    ReenterCardDetails,
    RetrySameSubmission,
    CorrectFields,
}
