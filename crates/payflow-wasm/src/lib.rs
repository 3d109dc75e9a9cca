//! # payflow-wasm
//!
//! WebAssembly bindings for payflow-rs.
//!
//! The browser form runs the same formatting and validation code as the
//! server, so inline errors and the server's verdict never disagree:
//! - Keystroke formatting (card number, IBAN, expiry date)
//! - Per-kind field schemas for rendering the form
//! - Field validation and masked labels
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmPaymentForm, schema_for } from 'payflow-wasm';
//!
//! await init();
//!
//! const form = new WasmPaymentForm('card_debit');
//! input.value = form.set_field('cardNumber', input.value);
//!
//! if (!form.validate()) {
//!   showErrors(JSON.parse(form.errors_json()));
//! }
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

use payflow_core::{
    format, CheckoutError, FieldErrors, PaymentMethodDetails, PaymentMethodKind,
    PaymentMethodRegistry, ValidationRules,
};
use wasm_bindgen::prelude::*;

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse_kind(kind: &str) -> Result<PaymentMethodKind, CheckoutError> {
    kind.parse()
}

fn parse_details(details_json: &str) -> Result<PaymentMethodDetails, CheckoutError> {
    Ok(serde_json::from_str(details_json)?)
}

/// Client-side state of one payment method form
#[wasm_bindgen]
pub struct WasmPaymentForm {
    details: PaymentMethodDetails,
    errors: FieldErrors,
    registry: PaymentMethodRegistry,
}

#[wasm_bindgen]
impl WasmPaymentForm {
    #[wasm_bindgen(constructor)]
    pub fn new(kind: &str) -> Result<WasmPaymentForm, JsValue> {
        Self::for_kind(kind, ValidationRules::default()).map_err(to_js)
    }

    /// Form with a non-default IBAN country prefix
    #[wasm_bindgen]
    pub fn with_iban_prefix(kind: &str, prefix: &str) -> Result<WasmPaymentForm, JsValue> {
        Self::for_kind(kind, ValidationRules::default().with_iban_prefix(prefix)).map_err(to_js)
    }

    #[wasm_bindgen(getter)]
    pub fn kind(&self) -> String {
        self.details.kind().to_string()
    }

    /// Store a keystroke and return the formatted value to show
    #[wasm_bindgen]
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<String, JsValue> {
        self.apply_edit(field, value).map_err(to_js)
    }

    /// Validate the whole form; errors are kept for `error_for`
    #[wasm_bindgen]
    pub fn validate(&mut self) -> bool {
        self.errors = self.registry.validate(&self.details);
        self.errors.is_empty()
    }

    #[wasm_bindgen]
    pub fn error_for(&self, field: &str) -> Option<String> {
        self.errors.get(field).map(str::to_string)
    }

    /// Current errors as a `{ field: message }` JSON object
    #[wasm_bindgen]
    pub fn errors_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.errors).map_err(to_js)
    }

    /// Details ready to POST to the API
    #[wasm_bindgen]
    pub fn details_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.details).map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn masked_label(&self) -> String {
        self.details.masked_label()
    }
}

impl WasmPaymentForm {
    fn for_kind(kind: &str, rules: ValidationRules) -> Result<Self, CheckoutError> {
        let kind = parse_kind(kind)?;
        let registry = PaymentMethodRegistry::new(rules);
        Ok(Self {
            details: registry.default_details(kind),
            errors: FieldErrors::new(),
            registry,
        })
    }

    fn apply_edit(&mut self, field: &str, value: &str) -> Result<String, CheckoutError> {
        let formatted = format::format_field(field, value);
        self.details.set_field(field, formatted.clone())?;
        self.errors.clear(field);
        Ok(formatted)
    }
}

/// Group card digits by four, max 16 digits
#[wasm_bindgen]
pub fn format_card_number(value: &str) -> String {
    format::format_card_number(value)
}

/// Uppercase and group IBAN characters by four
#[wasm_bindgen]
pub fn format_iban(value: &str) -> String {
    format::format_iban(value)
}

/// `MMYY` digits as `MM/YY`
#[wasm_bindgen]
pub fn format_expiry_date(value: &str) -> String {
    format::format_expiry_date(value)
}

/// Field schema of one kind, for rendering the form
#[wasm_bindgen]
pub fn schema_for(kind: &str) -> Result<JsValue, JsValue> {
    let kind = parse_kind(kind).map_err(to_js)?;
    let entry = PaymentMethodRegistry::default().get(kind);
    serde_wasm_bindgen::to_value(&entry).map_err(to_js)
}

/// All kinds with their schemas
#[wasm_bindgen]
pub fn method_kinds() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&PaymentMethodRegistry::default().entries()).map_err(to_js)
}

/// Validate details given as JSON; returns the error map as JSON
#[wasm_bindgen]
pub fn validate_method(details_json: &str) -> Result<String, JsValue> {
    let errors = validate_details_json(details_json).map_err(to_js)?;
    serde_json::to_string(&errors).map_err(to_js)
}

fn validate_details_json(details_json: &str) -> Result<FieldErrors, CheckoutError> {
    let details = parse_details(details_json)?;
    Ok(PaymentMethodRegistry::default().validate(&details))
}

/// Masked label (e.g. `Card •••• 4242`) of details given as JSON
#[wasm_bindgen]
pub fn masked_label(details_json: &str) -> Result<String, JsValue> {
    parse_details(details_json)
        .map(|d| d.masked_label())
        .map_err(to_js)
}

/// Log to browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_edit_formats_and_clears_error() {
        let mut form = WasmPaymentForm::for_kind("card_debit", ValidationRules::default()).unwrap();
        assert!(!form.validate());
        assert!(form.error_for("cardNumber").is_some());

        let shown = form.apply_edit("cardNumber", "4242424242424242").unwrap();
        assert_eq!(shown, "4242 4242 4242 4242");
        assert!(form.error_for("cardNumber").is_none());
        assert!(form.error_for("expiryDate").is_some());
        assert_eq!(form.masked_label(), "Card •••• 4242");
    }

    #[test]
    fn test_form_rejects_foreign_field() {
        let mut form = WasmPaymentForm::for_kind("postal_transfer", ValidationRules::default()).unwrap();
        assert!(matches!(
            form.apply_edit("iban", "TN59"),
            Err(CheckoutError::UnknownField { .. })
        ));
        assert!(WasmPaymentForm::for_kind("paypal", ValidationRules::default()).is_err());
    }

    #[test]
    fn test_complete_postal_form_validates() {
        let mut form = WasmPaymentForm::for_kind("postal_transfer", ValidationRules::default()).unwrap();
        for (field, value) in [
            ("accountHolderName", "Leila Mansour"),
            ("ccpNumber", "1234567"),
            ("phoneNumber", "98765432"),
            ("address", "3 Rue de Rome"),
            ("city", "Sousse"),
        ] {
            form.apply_edit(field, value).unwrap();
        }
        assert!(form.validate());
        assert_eq!(form.kind(), "postal_transfer");
    }

    #[test]
    fn test_validate_details_json() {
        let errors = validate_details_json(
            r#"{"kind":"postal_transfer","accountHolderName":"Leila","ccpNumber":"123456",
                "phoneNumber":"98765432","address":"3 Rue de Rome","city":"Sousse"}"#,
        )
        .unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains("ccpNumber"));

        assert!(matches!(
            validate_details_json("{not json"),
            Err(CheckoutError::Serialization(_))
        ));
    }

    #[test]
    fn test_formatters() {
        assert_eq!(format_iban("tn5912345678901234567890"), "TN59 1234 5678 9012 3456 7890");
        assert_eq!(format_expiry_date("1227"), "12/27");
        assert!(!version().is_empty());
    }
}
