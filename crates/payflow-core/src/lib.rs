//! # payflow-core
//!
//! Core types and traits for the payflow checkout engine.
//!
//! This crate provides:
//! - `PaymentMethodDetails`, a tagged union over bank transfer, card debit
//!   and postal transfer forms
//! - `PaymentMethodRegistry` and per-kind `FieldSpec` schemas
//! - Field validators and keystroke formatting helpers
//! - `PaymentGateway` trait and the `classify` step producing `SubmissionOutcome`
//! - `CheckoutStateMachine` driving validate -> submit -> record
//! - `RecordStore` trait with an in-memory implementation
//! - `PlanCatalog`, `SubscriptionRecord` and `PurchaseRecord`
//!
//! ## Example
//!
//! ```rust,ignore
//! use payflow_core::{CheckoutForm, CheckoutIntent, CheckoutStateMachine, InMemoryRecordStore, PaymentMethodKind};
//!
//! let machine = CheckoutStateMachine::new(
//!     CheckoutIntent::RegisterPayoutMethod,
//!     CheckoutForm::new(PaymentMethodKind::CardDebit),
//!     gateway,
//!     Arc::new(InMemoryRecordStore::new()),
//! );
//!
//! machine.edit_field("cardNumber", "4242424242424242")?;
//! // ... remaining fields
//!
//! match machine.submit().await? {
//!     SubmissionOutcome::Success(reference) => { /* navigated, record stored */ }
//!     other => { /* show other.error_kind() */ }
//! }
//! ```

pub mod error;
pub mod form;
pub mod format;
pub mod gateway;
#[cfg(feature = "runtime")]
pub mod machine;
pub mod method;
pub mod money;
pub mod outcome;
pub mod plan;
pub mod registry;
pub mod schema;
pub mod store;
pub mod subscription;
pub mod validate;

// Re-exports for convenience
pub use error::{CheckoutError, CheckoutResult};
pub use form::{BillingContact, CheckoutForm, Instrument};
pub use format::{format_card_number, format_expiry_date, format_field, format_iban};
pub use gateway::{
    classify, BoxedPaymentGateway, GatewayError, GatewayRequest, GatewayResponse, PaymentGateway,
};
#[cfg(feature = "runtime")]
pub use machine::{
    validate_form, CheckoutIntent, CheckoutState, CheckoutStateMachine, Destination,
    LoggingNavigator, MachineConfig, Navigator,
};
pub use method::{
    Bank, BankTransferDetails, CardDebitDetails, PaymentMethodDetails, PaymentMethodKind,
    PaymentMethodRecord, PostalTransferDetails,
};
pub use money::{Currency, Price};
pub use outcome::{ErrorKind, Recovery, SubmissionOutcome};
pub use plan::{BillingPeriod, Plan, PlanCatalog};
pub use registry::{MethodEntry, PaymentMethodRegistry};
pub use schema::{FieldFormat, FieldSpec};
pub use store::{
    BoxedRecordStore, InMemoryRecordStore, NewRecord, PaymentMethodDraft, Record, RecordDraft,
    RecordStore,
};
pub use subscription::{
    current_subscription, PurchaseRecord, SubscriptionRecord, SubscriptionStatus,
};
pub use validate::{validate, validate_with, FieldErrors, ValidationRules};
