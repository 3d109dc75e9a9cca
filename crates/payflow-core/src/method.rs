//! # Payment Method Types
//!
//! The closed set of payment methods a developer or subscriber can register.
//! A method is always a [`PaymentMethodDetails`] variant carrying its own
//! field set; the kind tag and the payload can never disagree.

use crate::error::{CheckoutError, CheckoutResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported payment method kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    BankTransfer,
    CardDebit,
    PostalTransfer,
}

impl PaymentMethodKind {
    /// Every kind, in display order
    pub const ALL: [PaymentMethodKind; 3] = [
        PaymentMethodKind::BankTransfer,
        PaymentMethodKind::CardDebit,
        PaymentMethodKind::PostalTransfer,
    ];

    /// Wire identifier (matches the serde tag)
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethodKind::BankTransfer => "bank_transfer",
            PaymentMethodKind::CardDebit => "card_debit",
            PaymentMethodKind::PostalTransfer => "postal_transfer",
        }
    }

    /// Human label for form tabs
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethodKind::BankTransfer => "Bank transfer",
            PaymentMethodKind::CardDebit => "Card debit",
            PaymentMethodKind::PostalTransfer => "Postal transfer",
        }
    }
}

impl fmt::Display for PaymentMethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethodKind {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethodKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CheckoutError::InvalidRequest(format!("Unknown payment method: {s}")))
    }
}

/// Banks accepted for bank transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bank {
    Biat,
    Stb,
    Bna,
    AttijariBank,
    AmenBank,
    BhBank,
    Uib,
    Ubci,
    BanqueZitouna,
    Atb,
}

impl Bank {
    pub const ALL: [Bank; 10] = [
        Bank::Biat,
        Bank::Stb,
        Bank::Bna,
        Bank::AttijariBank,
        Bank::AmenBank,
        Bank::BhBank,
        Bank::Uib,
        Bank::Ubci,
        Bank::BanqueZitouna,
        Bank::Atb,
    ];

    /// Display name, also the value the form submits
    pub fn name(&self) -> &'static str {
        match self {
            Bank::Biat => "BIAT",
            Bank::Stb => "STB",
            Bank::Bna => "BNA",
            Bank::AttijariBank => "Attijari Bank",
            Bank::AmenBank => "Amen Bank",
            Bank::BhBank => "BH Bank",
            Bank::Uib => "UIB",
            Bank::Ubci => "UBCI",
            Bank::BanqueZitouna => "Banque Zitouna",
            Bank::Atb => "ATB",
        }
    }

    /// Look up a bank by its display name (exact, after trimming)
    pub fn from_name(name: &str) -> Option<Bank> {
        let name = name.trim();
        Bank::ALL.into_iter().find(|bank| bank.name() == name)
    }

    pub fn names() -> Vec<&'static str> {
        Bank::ALL.iter().map(Bank::name).collect()
    }
}

/// Bank transfer payout details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BankTransferDetails {
    pub account_holder_name: String,
    /// Raw form value; must name one of [`Bank::ALL`]
    pub bank_name: String,
    pub iban: String,
    pub rib: String,
    pub account_number: String,
    pub address: String,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl BankTransferDetails {
    /// The selected bank, if the form value names a known one
    pub fn bank(&self) -> Option<Bank> {
        Bank::from_name(&self.bank_name)
    }
}

/// Card debit details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardDebitDetails {
    pub card_holder_name: String,
    pub card_number: String,
    /// MM/YY
    pub expiry_date: String,
    pub phone_number: String,
}

/// Postal giro (CCP) transfer details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostalTransferDetails {
    pub account_holder_name: String,
    pub ccp_number: String,
    pub phone_number: String,
    pub address: String,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

/// A payment method instance: kind tag plus that kind's fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentMethodDetails {
    BankTransfer(BankTransferDetails),
    CardDebit(CardDebitDetails),
    PostalTransfer(PostalTransferDetails),
}

impl PaymentMethodDetails {
    /// Empty form data for a kind
    pub fn empty(kind: PaymentMethodKind) -> Self {
        match kind {
            PaymentMethodKind::BankTransfer => {
                PaymentMethodDetails::BankTransfer(BankTransferDetails::default())
            }
            PaymentMethodKind::CardDebit => {
                PaymentMethodDetails::CardDebit(CardDebitDetails::default())
            }
            PaymentMethodKind::PostalTransfer => {
                PaymentMethodDetails::PostalTransfer(PostalTransferDetails::default())
            }
        }
    }

    pub fn kind(&self) -> PaymentMethodKind {
        match self {
            PaymentMethodDetails::BankTransfer(_) => PaymentMethodKind::BankTransfer,
            PaymentMethodDetails::CardDebit(_) => PaymentMethodKind::CardDebit,
            PaymentMethodDetails::PostalTransfer(_) => PaymentMethodKind::PostalTransfer,
        }
    }

    /// The account identifier a gateway charges against
    /// (IBAN, card number or CCP number), without separators.
    pub fn instrument_number(&self) -> String {
        let raw = match self {
            PaymentMethodDetails::BankTransfer(d) => &d.iban,
            PaymentMethodDetails::CardDebit(d) => &d.card_number,
            PaymentMethodDetails::PostalTransfer(d) => &d.ccp_number,
        };
        raw.chars().filter(|c| !c.is_whitespace()).collect()
    }

    /// Masked label safe for logs and listings, e.g. `Card •••• 4444`
    pub fn masked_label(&self) -> String {
        let number = self.instrument_number();
        let start = number.len().saturating_sub(4);
        let last4 = number.get(start..).unwrap_or_default();
        match self {
            PaymentMethodDetails::BankTransfer(d) => {
                let bank = d.bank().map(|b| b.name()).unwrap_or("Bank");
                format!("{bank} •••• {last4}")
            }
            PaymentMethodDetails::CardDebit(_) => format!("Card •••• {last4}"),
            PaymentMethodDetails::PostalTransfer(_) => format!("CCP •••• {last4}"),
        }
    }

    /// Write a single form field by its wire name.
    ///
    /// Values are stored as given; keystroke formatting is the caller's job
    /// (see [`crate::format::format_field`]). A blank `postalCode` clears it.
    pub fn set_field(&mut self, field: &str, value: String) -> CheckoutResult<()> {
        let kind = self.kind();
        let unknown = || CheckoutError::UnknownField {
            kind: kind.to_string(),
            field: field.to_string(),
        };

        match self {
            PaymentMethodDetails::BankTransfer(d) => match field {
                "accountHolderName" => d.account_holder_name = value,
                "bankName" => d.bank_name = value,
                "iban" => d.iban = value,
                "rib" => d.rib = value,
                "accountNumber" => d.account_number = value,
                "address" => d.address = value,
                "city" => d.city = value,
                "postalCode" => d.postal_code = optional(value),
                _ => return Err(unknown()),
            },
            PaymentMethodDetails::CardDebit(d) => match field {
                "cardHolderName" => d.card_holder_name = value,
                "cardNumber" => d.card_number = value,
                "expiryDate" => d.expiry_date = value,
                "phoneNumber" => d.phone_number = value,
                _ => return Err(unknown()),
            },
            PaymentMethodDetails::PostalTransfer(d) => match field {
                "accountHolderName" => d.account_holder_name = value,
                "ccpNumber" => d.ccp_number = value,
                "phoneNumber" => d.phone_number = value,
                "address" => d.address = value,
                "city" => d.city = value,
                "postalCode" => d.postal_code = optional(value),
                _ => return Err(unknown()),
            },
        }
        Ok(())
    }
}

fn optional(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// A stored payment method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodRecord {
    /// Opaque id assigned by the store
    pub id: String,

    pub kind: PaymentMethodKind,

    pub details: PaymentMethodDetails,

    /// Exactly one record per owner carries this flag
    pub is_default: bool,

    /// Gateway reference returned when the method was registered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_reference: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl PaymentMethodRecord {
    pub fn masked_label(&self) -> String {
        self.details.masked_label()
    }
}
