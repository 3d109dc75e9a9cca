//! # Simulator Configuration
//!
//! Behaviour knobs for the simulated gateway, loaded from environment
//! variables.

use payflow_core::CheckoutError;
use std::env;
use std::time::Duration;

/// Failure the simulator produces for a sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedFailure {
    /// Processor rejects with this decline code
    Reject(&'static str),
    /// Connection drops before an answer arrives
    Transport,
    /// Processor answers with something unparseable
    Malformed,
}

/// Instrument-number suffix that triggers a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinel {
    pub suffix: String,
    pub failure: SimulatedFailure,
}

impl Sentinel {
    pub fn new(suffix: impl Into<String>, failure: SimulatedFailure) -> Self {
        Self {
            suffix: suffix.into(),
            failure,
        }
    }
}

/// Default sentinel table, matched against the instrument number
/// (card number, IBAN or CCP number) with separators removed.
pub fn default_sentinels() -> Vec<Sentinel> {
    vec![
        Sentinel::new("0002", SimulatedFailure::Reject("declined")),
        Sentinel::new("9995", SimulatedFailure::Reject("insufficient_funds")),
        Sentinel::new("0069", SimulatedFailure::Reject("expired_card")),
        Sentinel::new("4444", SimulatedFailure::Transport),
        Sentinel::new("0119", SimulatedFailure::Malformed),
    ]
}

/// Simulated gateway configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Artificial delay before every answer
    pub latency: Duration,

    /// Prefix of approval references
    pub reference_prefix: String,

    /// Checked in order; first matching suffix wins
    pub sentinels: Vec<Sentinel>,
}

impl SimulatorConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional env vars:
    /// - `PAYFLOW_SIMULATED_LATENCY_MS` (default `0`)
    /// - `PAYFLOW_REFERENCE_PREFIX` (default `sim`)
    pub fn from_env() -> Result<Self, CheckoutError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let latency = match env::var("PAYFLOW_SIMULATED_LATENCY_MS") {
            Ok(raw) => {
                let ms: u64 = raw.trim().parse().map_err(|_| {
                    CheckoutError::Configuration(format!(
                        "PAYFLOW_SIMULATED_LATENCY_MS must be a number of milliseconds, got '{}'",
                        raw
                    ))
                })?;
                Duration::from_millis(ms)
            }
            Err(_) => Duration::ZERO,
        };

        let reference_prefix =
            env::var("PAYFLOW_REFERENCE_PREFIX").unwrap_or_else(|_| "sim".to_string());

        if reference_prefix.trim().is_empty() {
            return Err(CheckoutError::Configuration(
                "PAYFLOW_REFERENCE_PREFIX must not be blank".to_string(),
            ));
        }

        Ok(Self {
            latency,
            reference_prefix,
            sentinels: default_sentinels(),
        })
    }

    /// Builder: set latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Builder: replace the sentinel table
    pub fn with_sentinels(mut self, sentinels: Vec<Sentinel>) -> Self {
        self.sentinels = sentinels;
        self
    }

    /// First sentinel whose suffix ends `number`
    pub fn sentinel_for(&self, number: &str) -> Option<&Sentinel> {
        self.sentinels.iter().find(|s| number.ends_with(&s.suffix))
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            reference_prefix: "sim".to_string(),
            sentinels: default_sentinels(),
        }
    }
}
