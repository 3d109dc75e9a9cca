//! # Payment Gateway Trait
//!
//! The seam between the checkout engine and whatever actually moves money.
//! A gateway returns its raw answer; [`classify`] turns that answer into a
//! [`SubmissionOutcome`]. Callers only ever see the classified outcome.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                PaymentGateway (trait)                  │
//! │  ├── submit()            -> GatewayResponse | Error    │
//! │  ├── submit_classified() -> SubmissionOutcome          │
//! │  └── gateway_name()                                    │
//! └────────────────────────────────────────────────────────┘
//!                            ▲
//!           ┌────────────────┴────────────────┐
//!   ┌───────┴─────────────┐         ┌─────────┴─────────┐
//!   │ PaymentGateway      │         │  network client   │
//!   │ Simulator           │         │  (future)         │
//!   └─────────────────────┘         └───────────────────┘
//! ```

use crate::method::{PaymentMethodDetails, PaymentMethodKind};
use crate::money::Price;
use crate::outcome::SubmissionOutcome;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// What a gateway is asked to do
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    /// Unique per submission attempt; doubles as the idempotency key
    pub attempt_id: String,
    pub details: PaymentMethodDetails,
    /// Zero when only registering the method
    pub amount: Price,
}

impl GatewayRequest {
    pub fn kind(&self) -> PaymentMethodKind {
        self.details.kind()
    }
}

/// Raw gateway answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GatewayResponse {
    Approved { reference: String },
    Rejected { code: String },
}

/// Transport-level failure talking to a gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Gateway timed out")]
    Timeout,

    #[error("Malformed gateway response: {0}")]
    Malformed(String),
}

/// Gateway decline codes understood by [`classify`]
pub mod codes {
    pub const DECLINED: &str = "declined";
    pub const DO_NOT_HONOR: &str = "do_not_honor";
    pub const INSUFFICIENT_FUNDS: &str = "insufficient_funds";
    pub const EXPIRED_CARD: &str = "expired_card";
}

/// Map a raw gateway result onto the fixed outcome set.
///
/// Transport errors and any code not listed in [`codes`] become
/// `NetworkError`.
pub fn classify(result: Result<GatewayResponse, GatewayError>) -> SubmissionOutcome {
    match result {
        Ok(GatewayResponse::Approved { reference }) if !reference.trim().is_empty() => {
            SubmissionOutcome::Success(reference)
        }
        Ok(GatewayResponse::Approved { .. }) => {
            warn!("Gateway approved without a reference, treating as network error");
            SubmissionOutcome::NetworkError
        }
        Ok(GatewayResponse::Rejected { code }) => match code.as_str() {
            codes::DECLINED | codes::DO_NOT_HONOR => SubmissionOutcome::Declined,
            codes::INSUFFICIENT_FUNDS => SubmissionOutcome::InsufficientFunds,
            codes::EXPIRED_CARD => SubmissionOutcome::ExpiredCard,
            other => {
                warn!("Unknown gateway code '{}', treating as network error", other);
                SubmissionOutcome::NetworkError
            }
        },
        Err(e) => {
            warn!("Gateway error: {}", e);
            SubmissionOutcome::NetworkError
        }
    }
}

/// Payment processor boundary
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Send the request to the processor and return its raw answer.
    async fn submit(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError>;

    /// Gateway name (for logging and references)
    fn gateway_name(&self) -> &'static str;

    /// Submit and classify in one step.
    async fn submit_classified(&self, request: &GatewayRequest) -> SubmissionOutcome {
        classify(self.submit(request).await)
    }
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;
