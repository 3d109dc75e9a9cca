//! # Payment Method Registry
//!
//! Maps a [`PaymentMethodKind`] to its schema, blank form data and
//! validator. The registry is closed: its entries come from exhaustive
//! matches, not runtime registration.

use crate::method::{PaymentMethodDetails, PaymentMethodKind};
use crate::schema::{self, FieldSpec};
use crate::validate::{self, FieldErrors, ValidationRules};
use serde::Serialize;

/// Everything the UI and the state machine need to know about one kind
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodEntry {
    pub kind: PaymentMethodKind,
    pub label: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl MethodEntry {
    /// Blank form data for this kind
    pub fn default_details(&self) -> PaymentMethodDetails {
        PaymentMethodDetails::empty(self.kind)
    }

    /// Names of the fields the form must fill in
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }
}

/// Closed registry of payment methods
#[derive(Debug, Clone, Default)]
pub struct PaymentMethodRegistry {
    rules: ValidationRules,
}

impl PaymentMethodRegistry {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    pub fn get(&self, kind: PaymentMethodKind) -> MethodEntry {
        MethodEntry {
            kind,
            label: kind.label(),
            fields: schema::schema_with(&self.rules, kind),
        }
    }

    /// All entries, in display order
    pub fn entries(&self) -> Vec<MethodEntry> {
        PaymentMethodKind::ALL.into_iter().map(|k| self.get(k)).collect()
    }

    pub fn schema(&self, kind: PaymentMethodKind) -> Vec<FieldSpec> {
        schema::schema_with(&self.rules, kind)
    }

    pub fn default_details(&self, kind: PaymentMethodKind) -> PaymentMethodDetails {
        PaymentMethodDetails::empty(kind)
    }

    /// Validate details against the kind they carry
    pub fn validate(&self, details: &PaymentMethodDetails) -> FieldErrors {
        validate::validate_with(&self.rules, details)
    }
}
