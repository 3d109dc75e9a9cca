//! # Checkout Form
//!
//! What the UI hands to the state machine: billing contact fields plus the
//! payment instrument, either freshly entered or a saved method reference.

use crate::error::CheckoutResult;
use crate::method::{PaymentMethodDetails, PaymentMethodKind};
use serde::{Deserialize, Serialize};

/// Billing / contact block of the checkout form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingContact {
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone: String,
}

impl BillingContact {
    /// Field names as they appear in error maps
    pub const FIELDS: [&'static str; 4] =
        ["billingName", "billingEmail", "billingAddress", "billingPhone"];

    /// Returns `false` if the field is not a contact field
    pub fn set_field(&mut self, field: &str, value: String) -> bool {
        match field {
            "billingName" => self.name = value,
            "billingEmail" => self.email = value,
            "billingAddress" => self.address = value,
            "billingPhone" => self.phone = value,
            _ => return false,
        }
        true
    }
}

/// The instrument being charged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Instrument {
    /// A method already in the owner's record store
    Saved { id: String },
    /// A method typed into the form for this checkout
    New {
        #[serde(flatten)]
        details: PaymentMethodDetails,
    },
}

impl Instrument {
    pub fn new_method(kind: PaymentMethodKind) -> Self {
        Instrument::New {
            details: PaymentMethodDetails::empty(kind),
        }
    }

    pub fn details(&self) -> Option<&PaymentMethodDetails> {
        match self {
            Instrument::New { details } => Some(details),
            Instrument::Saved { .. } => None,
        }
    }
}

/// Complete form state owned by one checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub contact: BillingContact,
    pub instrument: Instrument,
}

impl CheckoutForm {
    /// Blank form for entering a new method of `kind`
    pub fn new(kind: PaymentMethodKind) -> Self {
        Self {
            contact: BillingContact::default(),
            instrument: Instrument::new_method(kind),
        }
    }

    /// Form that charges a saved method
    pub fn with_saved_method(id: impl Into<String>) -> Self {
        Self {
            contact: BillingContact::default(),
            instrument: Instrument::Saved { id: id.into() },
        }
    }

    /// Form pre-filled with method details
    pub fn with_details(details: PaymentMethodDetails) -> Self {
        Self {
            contact: BillingContact::default(),
            instrument: Instrument::New { details },
        }
    }

    pub fn with_contact(mut self, contact: BillingContact) -> Self {
        self.contact = contact;
        self
    }

    /// Write one field by wire name: contact fields first, then the
    /// instrument. `paymentMethodId` switches to a saved instrument.
    pub fn set_field(&mut self, field: &str, value: String) -> CheckoutResult<()> {
        if self.contact.set_field(field, value.clone()) {
            return Ok(());
        }
        if field == "paymentMethodId" {
            self.instrument = Instrument::Saved { id: value };
            return Ok(());
        }
        match &mut self.instrument {
            Instrument::New { details } => details.set_field(field, value),
            Instrument::Saved { .. } => Err(crate::error::CheckoutError::InvalidRequest(format!(
                "Field '{field}' cannot be edited while a saved method is selected"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckoutError;

    #[test]
    fn test_set_contact_and_method_fields() {
        let mut form = CheckoutForm::new(PaymentMethodKind::CardDebit);
        form.set_field("billingEmail", "dev@example.tn".into()).unwrap();
        form.set_field("cardNumber", "4242".into()).unwrap();

        assert_eq!(form.contact.email, "dev@example.tn");
        match form.instrument.details() {
            Some(PaymentMethodDetails::CardDebit(d)) => assert_eq!(d.card_number, "4242"),
            other => panic!("unexpected instrument: {other:?}"),
        }
    }

    #[test]
    fn test_saved_instrument_rejects_method_fields() {
        let mut form = CheckoutForm::new(PaymentMethodKind::CardDebit);
        form.set_field("paymentMethodId", "pm_1".into()).unwrap();
        assert_eq!(form.instrument, Instrument::Saved { id: "pm_1".into() });

        let err = form.set_field("cardNumber", "4242".into()).unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidRequest(_)));
    }

    #[test]
    fn test_instrument_serde_shape() {
        let json = serde_json::json!({
            "instrument": {
                "source": "new",
                "kind": "postal_transfer",
                "ccpNumber": "1234567"
            }
        });
        let form: CheckoutForm = serde_json::from_value(json).unwrap();
        match form.instrument.details() {
            Some(PaymentMethodDetails::PostalTransfer(d)) => assert_eq!(d.ccp_number, "1234567"),
            other => panic!("unexpected instrument: {other:?}"),
        }
    }
}
