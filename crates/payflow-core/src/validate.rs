//! # Field Validation
//!
//! Per-method validators producing a field -> message map. Validation never
//! fails as an operation: an empty [`FieldErrors`] means the form may be
//! submitted, anything else halts submission before the gateway is touched.

use crate::form::BillingContact;
use crate::method::{
    BankTransferDetails, CardDebitDetails, PaymentMethodDetails, PostalTransferDetails,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static EIGHT_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{8}$").expect("phone pattern"));
static SIXTEEN_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{16}$").expect("card pattern"));
static EXPIRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}$").expect("expiry pattern"));
static CCP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{7,10}$").expect("ccp pattern"));
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

/// Field name -> user-facing message, ordered by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    /// Drop the error of one field; returns true if there was one
    pub fn clear(&mut self, field: &str) -> bool {
        self.0.remove(field).is_some()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn merge(&mut self, other: FieldErrors) {
        self.0.extend(other.0);
    }
}

impl FromIterator<(String, String)> for FieldErrors {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Tunable parts of the bank transfer rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRules {
    /// Two-letter country code every IBAN must start with
    pub iban_prefix: String,
    /// IBAN length once whitespace is removed
    pub iban_length: usize,
}

impl ValidationRules {
    pub fn with_iban_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.iban_prefix = prefix.into().to_ascii_uppercase();
        self
    }
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            iban_prefix: "TN".to_string(),
            iban_length: 24,
        }
    }
}

/// Validate method details with the default rules
pub fn validate(details: &PaymentMethodDetails) -> FieldErrors {
    validate_with(&ValidationRules::default(), details)
}

/// Validate method details with explicit rules
pub fn validate_with(rules: &ValidationRules, details: &PaymentMethodDetails) -> FieldErrors {
    match details {
        PaymentMethodDetails::BankTransfer(d) => validate_bank_transfer(rules, d),
        PaymentMethodDetails::CardDebit(d) => validate_card_debit(d),
        PaymentMethodDetails::PostalTransfer(d) => validate_postal_transfer(d),
    }
}

pub fn validate_bank_transfer(rules: &ValidationRules, d: &BankTransferDetails) -> FieldErrors {
    let mut errors = FieldErrors::new();

    require(&mut errors, "accountHolderName", &d.account_holder_name, "Account holder name is required");

    if d.bank_name.trim().is_empty() {
        errors.insert("bankName", "Please select a bank");
    } else if d.bank().is_none() {
        errors.insert("bankName", "Please select a bank from the list");
    }

    let iban = strip_whitespace(&d.iban);
    if iban.is_empty() {
        errors.insert("iban", "IBAN is required");
    } else if !iban.starts_with(&rules.iban_prefix) {
        errors.insert("iban", format!("IBAN must start with {}", rules.iban_prefix));
    } else if iban.chars().count() != rules.iban_length {
        errors.insert(
            "iban",
            format!("IBAN must contain exactly {} characters", rules.iban_length),
        );
    }

    require(&mut errors, "rib", &d.rib, "RIB is required");
    require(&mut errors, "accountNumber", &d.account_number, "Account number is required");
    require(&mut errors, "address", &d.address, "Address is required");
    require(&mut errors, "city", &d.city, "City is required");

    errors
}

pub fn validate_card_debit(d: &CardDebitDetails) -> FieldErrors {
    let mut errors = FieldErrors::new();

    require(&mut errors, "cardHolderName", &d.card_holder_name, "Card holder name is required");

    if !SIXTEEN_DIGITS.is_match(&strip_whitespace(&d.card_number)) {
        errors.insert("cardNumber", "Card number must contain 16 digits");
    }

    if !EXPIRY.is_match(d.expiry_date.trim()) {
        errors.insert("expiryDate", "Expiry date must use the MM/YY format");
    }

    if !EIGHT_DIGITS.is_match(&strip_whitespace(&d.phone_number)) {
        errors.insert("phoneNumber", "Phone number must contain 8 digits");
    }

    errors
}

pub fn validate_postal_transfer(d: &PostalTransferDetails) -> FieldErrors {
    let mut errors = FieldErrors::new();

    require(&mut errors, "accountHolderName", &d.account_holder_name, "Account holder name is required");

    if !CCP.is_match(d.ccp_number.trim()) {
        errors.insert("ccpNumber", "CCP number must contain 7 to 10 digits");
    }

    if !EIGHT_DIGITS.is_match(d.phone_number.trim()) {
        errors.insert("phoneNumber", "Phone number must contain 8 digits");
    }

    require(&mut errors, "address", &d.address, "Address is required");
    require(&mut errors, "city", &d.city, "City is required");

    errors
}

/// Billing contact rules for subscription and purchase checkout
pub fn validate_contact(contact: &BillingContact) -> FieldErrors {
    let mut errors = FieldErrors::new();

    require(&mut errors, "billingName", &contact.name, "Name is required");

    let email = contact.email.trim();
    if email.is_empty() {
        errors.insert("billingEmail", "Email is required");
    } else if !EMAIL.is_match(email) {
        errors.insert("billingEmail", "Email address is not valid");
    }

    require(&mut errors, "billingAddress", &contact.address, "Address is required");
    require(&mut errors, "billingPhone", &contact.phone, "Phone is required");

    errors
}

fn require(errors: &mut FieldErrors, field: &str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.insert(field, message);
    }
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}
