//! # Payment Gateway Simulator
//!
//! Stands in for a real processor. The answer is decided by a sentinel
//! suffix on the instrument number; anything without a sentinel is
//! approved with a fresh reference. Approvals are idempotent per attempt
//! id, as a processor honoring idempotency keys would be.

use crate::config::{SimulatedFailure, SimulatorConfig};
use async_trait::async_trait;
use payflow_core::{
    CheckoutResult, GatewayError, GatewayRequest, GatewayResponse, PaymentGateway,
};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Sentinel-driven gateway
pub struct PaymentGatewaySimulator {
    config: SimulatorConfig,
    /// attempt id -> approved reference
    approvals: Mutex<HashMap<String, String>>,
}

impl PaymentGatewaySimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            approvals: Mutex::new(HashMap::new()),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> CheckoutResult<Self> {
        let config = SimulatorConfig::from_env()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    fn answer(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let number = request.details.instrument_number();

        match self.config.sentinel_for(&number).map(|s| &s.failure) {
            Some(SimulatedFailure::Reject(code)) => Ok(GatewayResponse::Rejected {
                code: code.to_string(),
            }),
            Some(SimulatedFailure::Transport) => Err(GatewayError::Transport(
                "connection reset by simulated processor".to_string(),
            )),
            Some(SimulatedFailure::Malformed) => Err(GatewayError::Malformed(
                "simulated processor returned an empty body".to_string(),
            )),
            None => Ok(GatewayResponse::Approved {
                reference: self.approve(&request.attempt_id),
            }),
        }
    }

    fn approve(&self, attempt_id: &str) -> String {
        let mut approvals = self.approvals.lock().unwrap_or_else(PoisonError::into_inner);
        approvals
            .entry(attempt_id.to_string())
            .or_insert_with(|| {
                format!("{}_{}", self.config.reference_prefix, Uuid::new_v4().simple())
            })
            .clone()
    }
}

impl Default for PaymentGatewaySimulator {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

#[async_trait]
impl PaymentGateway for PaymentGatewaySimulator {
    #[instrument(skip(self, request), fields(attempt_id = %request.attempt_id, kind = %request.kind()))]
    async fn submit(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        if !self.config.latency.is_zero() {
            debug!("Simulating {:?} of latency", self.config.latency);
            tokio::time::sleep(self.config.latency).await;
        }

        let result = self.answer(request);
        info!(
            "Simulated gateway answer for {} ({}): {:?}",
            request.details.masked_label(),
            request.amount.display(),
            result
        );
        result
    }

    fn gateway_name(&self) -> &'static str {
        "simulator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payflow_core::{
        CardDebitDetails, Currency, PaymentMethodDetails, PostalTransferDetails, Price,
        SubmissionOutcome,
    };
    use std::time::Duration;

    fn card_request(number: &str) -> GatewayRequest {
        GatewayRequest {
            attempt_id: "attempt-1".into(),
            details: PaymentMethodDetails::CardDebit(CardDebitDetails {
                card_holder_name: "Amira Ben Salah".into(),
                card_number: number.into(),
                expiry_date: "12/27".into(),
                phone_number: "22123456".into(),
            }),
            amount: Price::new(49.9, Currency::TND),
        }
    }

    #[tokio::test]
    async fn test_sentinels_classify_to_fixed_outcomes() {
        let gateway = PaymentGatewaySimulator::default();
        let cases = [
            ("4000 0000 0000 0002", SubmissionOutcome::Declined),
            ("4000 0000 0000 9995", SubmissionOutcome::InsufficientFunds),
            ("4000 0000 0000 0069", SubmissionOutcome::ExpiredCard),
            ("4444444444444444", SubmissionOutcome::NetworkError),
            ("4000 0000 0000 0119", SubmissionOutcome::NetworkError),
        ];
        for (number, expected) in cases {
            assert_eq!(
                gateway.submit_classified(&card_request(number)).await,
                expected,
                "{number}"
            );
        }
    }

    #[tokio::test]
    async fn test_approval_reference() {
        let gateway = PaymentGatewaySimulator::default();
        match gateway.submit_classified(&card_request("4242 4242 4242 4242")).await {
            SubmissionOutcome::Success(reference) => assert!(reference.starts_with("sim_")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_repeated_attempt_returns_same_reference() {
        let gateway = PaymentGatewaySimulator::default();
        let request = card_request("4242 4242 4242 4242");

        let first = gateway.submit(&request).await.unwrap();
        let second = gateway.submit(&request).await.unwrap();
        assert_eq!(first, second);

        let other = GatewayRequest {
            attempt_id: "attempt-9".into(),
            ..request
        };
        assert_ne!(gateway.submit(&other).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_sentinel_applies_to_ccp_numbers() {
        let gateway = PaymentGatewaySimulator::default();
        let request = GatewayRequest {
            attempt_id: "attempt-2".into(),
            details: PaymentMethodDetails::PostalTransfer(PostalTransferDetails {
                ccp_number: "12349995".into(),
                ..Default::default()
            }),
            amount: Price::zero(Currency::TND),
        };
        assert_eq!(
            gateway.submit_classified(&request).await,
            SubmissionOutcome::InsufficientFunds
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let gateway = PaymentGatewaySimulator::new(
            SimulatorConfig::default().with_latency(Duration::from_millis(750)),
        );
        let started = tokio::time::Instant::now();
        gateway.submit(&card_request("4242424242424242")).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(750));
    }
}
