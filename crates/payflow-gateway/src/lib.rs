//! # payflow-gateway
//!
//! Simulated payment gateway for payflow-rs.
//!
//! There is no real processor behind the checkout flow yet. The
//! `PaymentGatewaySimulator` implements `payflow_core::PaymentGateway` and
//! decides each answer from a sentinel suffix on the instrument number:
//!
//! | Suffix | Answer | Classified as |
//! |--------|--------|---------------|
//! | `0002` | rejected `declined` | `Declined` |
//! | `9995` | rejected `insufficient_funds` | `InsufficientFunds` |
//! | `0069` | rejected `expired_card` | `ExpiredCard` |
//! | `4444` | transport error | `NetworkError` |
//! | `0119` | malformed response | `NetworkError` |
//! | other | approved | `Success(reference)` |
//!
//! A network client for a real processor implements the same trait and
//! replaces the simulator without touching the state machine.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use payflow_gateway::PaymentGatewaySimulator;
//!
//! let gateway = Arc::new(PaymentGatewaySimulator::from_env()?);
//! let machine = CheckoutStateMachine::new(intent, form, gateway, store);
//! ```

pub mod config;
pub mod simulator;

// Re-exports
pub use config::{default_sentinels, Sentinel, SimulatedFailure, SimulatorConfig};
pub use simulator::PaymentGatewaySimulator;
