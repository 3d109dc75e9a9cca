//! # Money Types
//!
//! Currencies and prices, always held in the smallest currency unit.

use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    TND,
    EUR,
    USD,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::TND => "tnd",
            Currency::EUR => "eur",
            Currency::USD => "usd",
        }
    }

    /// Returns the number of decimal places for this currency
    /// (the dinar is divided into 1000 millimes)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::TND => 3,
            _ => 2,
        }
    }

    /// Convert a decimal amount to the smallest currency unit
    pub fn to_smallest_unit(&self, amount: f64) -> i64 {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        (amount * multiplier).round() as i64
    }

    /// Convert from smallest unit back to decimal
    pub fn from_smallest_unit(&self, amount: i64) -> f64 {
        let divisor = 10_f64.powi(self.decimal_places() as i32);
        amount as f64 / divisor
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Price with amount in smallest currency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in smallest currency unit (millimes for TND)
    pub amount: i64,
    pub currency: Currency,
}

impl Price {
    /// Create a new price from decimal amount
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self {
            amount: currency.to_smallest_unit(amount),
            currency,
        }
    }

    /// Create a price from smallest unit
    pub fn from_minor(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Zero amount, used when registering a method without charging it
    pub fn zero(currency: Currency) -> Self {
        Self::from_minor(0, currency)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Whether this is a chargeable amount
    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    /// Get the decimal amount
    pub fn as_decimal(&self) -> f64 {
        self.currency.from_smallest_unit(self.amount)
    }

    /// Format for display (e.g., "29.900 TND", "€19.99")
    pub fn display(&self) -> String {
        match self.currency {
            Currency::TND => format!("{:.3} TND", self.as_decimal()),
            Currency::EUR => format!("€{:.2}", self.as_decimal()),
            Currency::USD => format!("${:.2}", self.as_decimal()),
        }
    }
}
