//! # Payment Method Schemas
//!
//! Static field descriptions the form renderer draws from. One table per
//! [`PaymentMethodKind`]; the match in [`schema`] is exhaustive, so a new
//! kind cannot ship without its fields. [`schema_with`] adapts the tables
//! to a set of [`ValidationRules`], so the IBAN mask follows the configured
//! country prefix and length.

use crate::method::PaymentMethodKind;
use crate::validate::ValidationRules;
use serde::Serialize;
use std::borrow::Cow;

/// How a field is entered and displayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldFormat {
    /// Free text
    Text,
    /// One of a closed list of values
    Choice { options: &'static [&'static str] },
    /// Digits (or alphanumerics) shown through a display mask, `#` = one character
    Masked { mask: Cow<'static, str> },
    /// Month/year as `MM/YY`
    MonthYear,
}

/// Description of one form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    /// Wire name, also the key in error maps
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub format: FieldFormat,
    pub max_length: usize,
}

impl FieldSpec {
    const fn text(name: &'static str, label: &'static str, max_length: usize) -> Self {
        Self {
            name,
            label,
            required: true,
            format: FieldFormat::Text,
            max_length,
        }
    }

    const fn masked(
        name: &'static str,
        label: &'static str,
        mask: &'static str,
        max_length: usize,
    ) -> Self {
        Self {
            name,
            label,
            required: true,
            format: FieldFormat::Masked {
                mask: Cow::Borrowed(mask),
            },
            max_length,
        }
    }

    const fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Bank names offered in the bank transfer form; mirrors [`crate::method::Bank`]
pub const BANK_OPTIONS: &[&str] = &[
    "BIAT",
    "STB",
    "BNA",
    "Attijari Bank",
    "Amen Bank",
    "BH Bank",
    "UIB",
    "UBCI",
    "Banque Zitouna",
    "ATB",
];

const BANK_TRANSFER_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("accountHolderName", "Account holder name", 100),
    FieldSpec {
        name: "bankName",
        label: "Bank",
        required: true,
        format: FieldFormat::Choice {
            options: BANK_OPTIONS,
        },
        max_length: 32,
    },
    FieldSpec::masked("iban", "IBAN", "TN## #### #### #### #### ####", 29),
    FieldSpec::masked("rib", "RIB", "####################", 20),
    FieldSpec::text("accountNumber", "Account number", 20),
    FieldSpec::text("address", "Address", 200),
    FieldSpec::text("city", "City", 100),
    FieldSpec::text("postalCode", "Postal code", 10).optional(),
];

const CARD_DEBIT_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("cardHolderName", "Card holder name", 100),
    FieldSpec::masked("cardNumber", "Card number", "#### #### #### ####", 19),
    FieldSpec {
        name: "expiryDate",
        label: "Expiry date",
        required: true,
        format: FieldFormat::MonthYear,
        max_length: 5,
    },
    FieldSpec::masked("phoneNumber", "Phone number", "## ### ###", 10),
];

const POSTAL_TRANSFER_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("accountHolderName", "Account holder name", 100),
    FieldSpec::masked("ccpNumber", "CCP number", "##########", 10),
    FieldSpec::masked("phoneNumber", "Phone number", "########", 8),
    FieldSpec::text("address", "Address", 200),
    FieldSpec::text("city", "City", 100),
    FieldSpec::text("postalCode", "Postal code", 10).optional(),
];

/// Field table for a kind
pub fn schema(kind: PaymentMethodKind) -> &'static [FieldSpec] {
    match kind {
        PaymentMethodKind::BankTransfer => BANK_TRANSFER_FIELDS,
        PaymentMethodKind::CardDebit => CARD_DEBIT_FIELDS,
        PaymentMethodKind::PostalTransfer => POSTAL_TRANSFER_FIELDS,
    }
}

/// Field table for a kind under `rules`
pub fn schema_with(rules: &ValidationRules, kind: PaymentMethodKind) -> Vec<FieldSpec> {
    schema(kind)
        .iter()
        .cloned()
        .map(|mut spec| {
            if spec.name == "iban" {
                let mask = iban_mask(rules);
                spec.max_length = mask.chars().count();
                spec.format = FieldFormat::Masked {
                    mask: Cow::Owned(mask),
                };
            }
            spec
        })
        .collect()
}

/// `TN` + 24 characters -> `TN## #### #### #### #### ####`
fn iban_mask(rules: &ValidationRules) -> String {
    let slots = rules
        .iban_prefix
        .chars()
        .chain(std::iter::repeat('#'))
        .take(rules.iban_length.max(rules.iban_prefix.chars().count()))
        .collect::<Vec<_>>();
    slots
        .chunks(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Look up a single field of a kind
pub fn field(kind: PaymentMethodKind, name: &str) -> Option<&'static FieldSpec> {
    schema(kind).iter().find(|f| f.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::{Bank, PaymentMethodDetails};

    #[test]
    fn test_bank_options_match_enum() {
        assert_eq!(BANK_OPTIONS, Bank::names().as_slice());
    }

    #[test]
    fn test_postal_code_is_optional_everywhere_it_appears() {
        for kind in PaymentMethodKind::ALL {
            if let Some(spec) = field(kind, "postalCode") {
                assert!(!spec.required, "{kind}");
            }
        }
    }

    #[test]
    fn test_every_schema_field_is_settable() {
        for kind in PaymentMethodKind::ALL {
            let mut details = PaymentMethodDetails::empty(kind);
            for spec in schema(kind) {
                details
                    .set_field(spec.name, "x".into())
                    .unwrap_or_else(|e| panic!("{kind}.{}: {e}", spec.name));
            }
        }
    }

    #[test]
    fn test_schema_serialization() {
        let json = serde_json::to_value(field(PaymentMethodKind::CardDebit, "cardNumber")).unwrap();
        assert_eq!(json["name"], "cardNumber");
        assert_eq!(json["maxLength"], 19);
        assert_eq!(json["format"]["type"], "masked");
        assert_eq!(json["format"]["mask"], "#### #### #### ####");
    }

    fn iban_spec(rules: &ValidationRules) -> FieldSpec {
        schema_with(rules, PaymentMethodKind::BankTransfer)
            .into_iter()
            .find(|f| f.name == "iban")
            .unwrap()
    }

    #[test]
    fn test_iban_mask_follows_rules() {
        let default = iban_spec(&ValidationRules::default());
        assert_eq!(&default, field(PaymentMethodKind::BankTransfer, "iban").unwrap());

        let french = iban_spec(&ValidationRules {
            iban_prefix: "FR".into(),
            iban_length: 27,
        });
        assert_eq!(
            french.format,
            FieldFormat::Masked {
                mask: Cow::Borrowed("FR## #### #### #### #### #### ###")
            }
        );
        assert_eq!(french.max_length, 33);
    }
}
