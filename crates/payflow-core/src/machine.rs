//! # Checkout State Machine
//!
//! Drives one form through `Idle -> Validating -> Submitting ->
//! Succeeded | Failed`. The same machine serves payout-method onboarding,
//! model subscriptions and one-time purchases; the [`CheckoutIntent`]
//! decides what is charged and which record is appended on success.
//!
//! Mutual exclusion comes from the `Submitting` state itself: a second
//! `submit()` while one is in flight is rejected, and a successful form
//! refuses further submits until a field is edited. The gateway call and
//! the record append run in a spawned task, so dropping the caller's
//! future does not cancel an attempt that already reached the gateway.

use crate::error::{CheckoutError, CheckoutResult};
use crate::form::{CheckoutForm, Instrument};
use crate::format::format_field;
use crate::gateway::{BoxedPaymentGateway, GatewayRequest};
use crate::method::PaymentMethodDetails;
use crate::money::{Currency, Price};
use crate::outcome::{ErrorKind, SubmissionOutcome};
use crate::plan::Plan;
use crate::registry::PaymentMethodRegistry;
use crate::store::{BoxedRecordStore, NewRecord, PaymentMethodDraft, RecordDraft};
use crate::subscription::{PurchaseRecord, SubscriptionRecord};
use crate::validate::{validate_contact, FieldErrors, ValidationRules};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Error map key used when a saved method cannot be charged
pub const SAVED_METHOD_FIELD: &str = "paymentMethodId";

/// Where a form is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    Idle,
    Validating,
    Submitting,
    Succeeded { reference_id: String, record_id: String },
    Failed { error: ErrorKind },
}

impl CheckoutState {
    pub fn is_busy(&self) -> bool {
        matches!(self, CheckoutState::Validating | CheckoutState::Submitting)
    }

    pub fn error(&self) -> Option<&ErrorKind> {
        match self {
            CheckoutState::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// What a successful checkout produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckoutIntent {
    /// Developer payout-method onboarding; nothing is charged
    RegisterPayoutMethod,
    /// Model subscription on a catalog plan
    Subscribe { resource_id: String, plan: Plan },
    /// One-time dataset or model purchase
    Purchase { resource_id: String, price: Price },
}

impl CheckoutIntent {
    /// Amount sent to the gateway
    pub fn amount(&self, currency: Currency) -> Price {
        match self {
            CheckoutIntent::RegisterPayoutMethod => Price::zero(currency),
            CheckoutIntent::Subscribe { plan, .. } => plan.price,
            CheckoutIntent::Purchase { price, .. } => *price,
        }
    }

    /// Charges need billing contact details; registering a method does not
    pub fn requires_contact(&self) -> bool {
        !matches!(self, CheckoutIntent::RegisterPayoutMethod)
    }

    fn label(&self) -> &'static str {
        match self {
            CheckoutIntent::RegisterPayoutMethod => "register_payout_method",
            CheckoutIntent::Subscribe { .. } => "subscribe",
            CheckoutIntent::Purchase { .. } => "purchase",
        }
    }
}

/// Navigation target after a successful checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum Destination {
    PayoutMethods,
    Subscription { id: String },
    Purchase { id: String },
}

impl Destination {
    pub fn path(&self) -> String {
        match self {
            Destination::PayoutMethods => "/developer/payout-methods".to_string(),
            Destination::Subscription { id } => format!("/subscriptions/{}", id),
            Destination::Purchase { id } => format!("/purchases/{}", id),
        }
    }
}

/// Receives the single navigation side effect of a successful attempt
pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: &Destination);
}

/// Navigator that only logs (default)
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn navigate(&self, destination: &Destination) {
        info!("Navigate to {}", destination.path());
    }
}

#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Upper bound on the gateway call; elapsed means `NetworkError`
    pub submit_timeout: Duration,
    pub rules: ValidationRules,
    /// Currency of the zero amount sent when registering a method
    pub currency: Currency,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            submit_timeout: Duration::from_secs(15),
            rules: ValidationRules::default(),
            currency: Currency::TND,
        }
    }
}

/// Validate a whole form for an intent (contact block + new method details)
pub fn validate_form(
    intent: &CheckoutIntent,
    registry: &PaymentMethodRegistry,
    form: &CheckoutForm,
) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if intent.requires_contact() {
        errors.merge(validate_contact(&form.contact));
    }
    match &form.instrument {
        Instrument::New { details } => errors.merge(registry.validate(details)),
        Instrument::Saved { .. } if matches!(intent, CheckoutIntent::RegisterPayoutMethod) => {
            errors.insert(SAVED_METHOD_FIELD, "Enter the details of the method to register");
        }
        Instrument::Saved { id } if id.trim().is_empty() => {
            errors.insert(SAVED_METHOD_FIELD, "Please select a payment method");
        }
        Instrument::Saved { .. } => {}
    }
    errors
}

struct Session {
    state: CheckoutState,
    form: CheckoutForm,
    errors: FieldErrors,
    /// Attempt to reuse when retrying after a network error
    retry_attempt: Option<String>,
    /// The UI left; skip navigation when a late attempt completes
    abandoned: bool,
}

struct MachineInner {
    intent: CheckoutIntent,
    gateway: BoxedPaymentGateway,
    store: BoxedRecordStore,
    navigator: Arc<dyn Navigator>,
    registry: PaymentMethodRegistry,
    config: MachineConfig,
    session: Mutex<Session>,
}

impl MachineInner {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One checkout form. Cheap to clone; clones share the same form.
#[derive(Clone)]
pub struct CheckoutStateMachine {
    inner: Arc<MachineInner>,
}

impl CheckoutStateMachine {
    pub fn new(
        intent: CheckoutIntent,
        form: CheckoutForm,
        gateway: BoxedPaymentGateway,
        store: BoxedRecordStore,
    ) -> Self {
        Self::with_parts(intent, form, gateway, store, Arc::new(LoggingNavigator), MachineConfig::default())
    }

    pub fn with_parts(
        intent: CheckoutIntent,
        form: CheckoutForm,
        gateway: BoxedPaymentGateway,
        store: BoxedRecordStore,
        navigator: Arc<dyn Navigator>,
        config: MachineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(MachineInner {
                intent,
                gateway,
                store,
                navigator,
                registry: PaymentMethodRegistry::new(config.rules.clone()),
                config,
                session: Mutex::new(Session {
                    state: CheckoutState::Idle,
                    form,
                    errors: FieldErrors::new(),
                    retry_attempt: None,
                    abandoned: false,
                }),
            }),
        }
    }

    /// Submit under a caller-supplied attempt id, such as a client
    /// idempotency key. Repeating a key repeats the attempt rather than
    /// starting a new one.
    pub fn with_attempt_id(self, attempt_id: impl Into<String>) -> Self {
        self.inner.session().retry_attempt = Some(attempt_id.into());
        self
    }

    pub fn intent(&self) -> &CheckoutIntent {
        &self.inner.intent
    }

    pub fn state(&self) -> CheckoutState {
        self.inner.session().state.clone()
    }

    pub fn form(&self) -> CheckoutForm {
        self.inner.session().form.clone()
    }

    /// Inline errors currently displayed
    pub fn field_errors(&self) -> FieldErrors {
        self.inner.session().errors.clone()
    }

    /// Keystroke edit: format, store, clear that field's error.
    /// A failed or completed form goes back to `Idle`.
    pub fn edit_field(&self, field: &str, value: &str) -> CheckoutResult<()> {
        let mut session = self.inner.session();
        if session.state.is_busy() {
            return Err(CheckoutError::SubmissionInProgress);
        }

        session.form.set_field(field, format_field(field, value))?;
        session.errors.clear(field);
        session.retry_attempt = None;
        session.abandoned = false;
        if matches!(
            session.state,
            CheckoutState::Failed { .. } | CheckoutState::Succeeded { .. }
        ) {
            session.state = CheckoutState::Idle;
        }
        Ok(())
    }

    /// Validate the current form without changing state; errors are kept
    /// for inline display.
    pub fn validate(&self) -> FieldErrors {
        let mut session = self.inner.session();
        let errors = validate_form(&self.inner.intent, &self.inner.registry, &session.form);
        session.errors = errors.clone();
        errors
    }

    /// The UI navigated away. A pending attempt still completes and is
    /// recorded, but no navigation fires.
    pub fn abandon(&self) {
        self.inner.session().abandoned = true;
    }

    /// Validate and, if clean, submit to the gateway.
    ///
    /// Returns `Err` only when the call itself is refused (already
    /// submitting, already succeeded); every payment result is an `Ok`.
    #[instrument(skip(self), fields(intent = self.inner.intent.label()))]
    pub async fn submit(&self) -> CheckoutResult<SubmissionOutcome> {
        let (attempt_id, form) = {
            let mut session = self.inner.session();
            match session.state {
                CheckoutState::Validating | CheckoutState::Submitting => {
                    warn!("Rejected submit: attempt already in flight");
                    return Err(CheckoutError::SubmissionInProgress);
                }
                CheckoutState::Succeeded { .. } => {
                    warn!("Rejected submit: form already succeeded");
                    return Err(CheckoutError::AlreadySubmitted);
                }
                CheckoutState::Idle | CheckoutState::Failed { .. } => {}
            }

            session.state = CheckoutState::Validating;
            let errors = validate_form(&self.inner.intent, &self.inner.registry, &session.form);
            if !errors.is_empty() {
                debug!("Validation failed on {} field(s)", errors.len());
                session.errors = errors.clone();
                session.state = CheckoutState::Failed {
                    error: ErrorKind::ValidationFailed(errors.clone()),
                };
                return Ok(SubmissionOutcome::ValidationFailed(errors));
            }

            session.errors = FieldErrors::new();
            session.state = CheckoutState::Submitting;
            let attempt_id = session
                .retry_attempt
                .take()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            (attempt_id, session.form.clone())
        };

        info!("Submitting attempt {}", attempt_id);

        let inner = self.inner.clone();
        let task_attempt = attempt_id.clone();
        let handle = tokio::spawn(async move { run_attempt(inner, task_attempt, form).await });

        match handle.await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("Attempt {} task failed: {}", attempt_id, e);
                let mut session = self.inner.session();
                session.state = CheckoutState::Failed {
                    error: ErrorKind::NetworkError,
                };
                session.retry_attempt = Some(attempt_id);
                Ok(SubmissionOutcome::NetworkError)
            }
        }
    }
}

/// Gateway call, record append and final transition for one attempt.
async fn run_attempt(
    inner: Arc<MachineInner>,
    attempt_id: String,
    form: CheckoutForm,
) -> SubmissionOutcome {
    let details = match resolve_instrument(&inner, &form.instrument).await {
        Ok(details) => details,
        Err(outcome) => return finish_failed(&inner, &attempt_id, outcome),
    };

    let request = GatewayRequest {
        attempt_id: attempt_id.clone(),
        amount: inner.intent.amount(inner.config.currency),
        details,
    };

    debug!(
        "Gateway {} <- {} ({})",
        inner.gateway.gateway_name(),
        request.details.masked_label(),
        request.amount.display()
    );

    let outcome = match tokio::time::timeout(
        inner.config.submit_timeout,
        inner.gateway.submit_classified(&request),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(
                "Gateway did not answer within {:?}",
                inner.config.submit_timeout
            );
            SubmissionOutcome::NetworkError
        }
    };

    let reference_id = match outcome.reference_id() {
        Some(reference) => reference.to_string(),
        None => return finish_failed(&inner, &attempt_id, outcome),
    };

    let draft = build_record(&inner.intent, &form.instrument, &request, &reference_id);
    let record = NewRecord::for_attempt(attempt_id.clone(), draft.clone());

    let record_id = match inner.store.append(record).await {
        Ok(id) => id,
        Err(e) => {
            error!("Charge {} succeeded but the record was not stored: {}", reference_id, e);
            return finish_failed(&inner, &attempt_id, SubmissionOutcome::NetworkError);
        }
    };

    let destination = destination_for(&draft, record_id.clone());
    let navigate = {
        let mut session = inner.session();
        session.state = CheckoutState::Succeeded {
            reference_id: reference_id.clone(),
            record_id: record_id.clone(),
        };
        session.retry_attempt = None;
        !session.abandoned
    };

    info!("Attempt {} succeeded: record {}", attempt_id, record_id);
    if navigate {
        inner.navigator.navigate(&destination);
    }

    outcome
}

/// Details to charge: typed in, or looked up from the store
async fn resolve_instrument(
    inner: &MachineInner,
    instrument: &Instrument,
) -> Result<PaymentMethodDetails, SubmissionOutcome> {
    match instrument {
        Instrument::New { details } => Ok(details.clone()),
        Instrument::Saved { id } => match inner.store.payment_method(id).await {
            Ok(Some(record)) => Ok(record.details),
            Ok(None) => {
                let mut errors = FieldErrors::new();
                errors.insert(SAVED_METHOD_FIELD, "Selected payment method no longer exists");
                Err(SubmissionOutcome::ValidationFailed(errors))
            }
            Err(e) => {
                error!("Could not load saved method {}: {}", id, e);
                Err(SubmissionOutcome::NetworkError)
            }
        },
    }
}

fn build_record(
    intent: &CheckoutIntent,
    instrument: &Instrument,
    request: &GatewayRequest,
    reference_id: &str,
) -> RecordDraft {
    let method_ref = match instrument {
        Instrument::Saved { id } => id.clone(),
        Instrument::New { details } => details.masked_label(),
    };

    match intent {
        CheckoutIntent::RegisterPayoutMethod => RecordDraft::PaymentMethod(PaymentMethodDraft {
            details: request.details.clone(),
            gateway_reference: Some(reference_id.to_string()),
        }),
        CheckoutIntent::Subscribe { resource_id, plan } if plan.is_recurring() => {
            RecordDraft::Subscription(SubscriptionRecord::start(
                resource_id.clone(),
                plan,
                method_ref,
                reference_id,
                Utc::now(),
            ))
        }
        CheckoutIntent::Subscribe { resource_id, plan } => RecordDraft::Purchase(
            PurchaseRecord::new(resource_id.clone(), plan.price, method_ref, reference_id),
        ),
        CheckoutIntent::Purchase { resource_id, price } => RecordDraft::Purchase(
            PurchaseRecord::new(resource_id.clone(), *price, method_ref, reference_id),
        ),
    }
}

fn destination_for(draft: &RecordDraft, record_id: String) -> Destination {
    match draft {
        RecordDraft::PaymentMethod(_) => Destination::PayoutMethods,
        RecordDraft::Subscription(_) => Destination::Subscription { id: record_id },
        RecordDraft::Purchase(_) => Destination::Purchase { id: record_id },
    }
}

fn finish_failed(
    inner: &MachineInner,
    attempt_id: &str,
    outcome: SubmissionOutcome,
) -> SubmissionOutcome {
    let error = outcome.error_kind().unwrap_or(ErrorKind::NetworkError);
    info!("Attempt {} failed: {:?}", attempt_id, error);

    let mut session = inner.session();
    if let Some(fields) = error.field_errors() {
        session.errors = fields.clone();
    }
    session.retry_attempt = match error {
        ErrorKind::NetworkError => Some(attempt_id.to_string()),
        _ => None,
    };
    session.state = CheckoutState::Failed { error };
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::BillingContact;
    use crate::gateway::{GatewayError, GatewayResponse, PaymentGateway};
    use crate::method::{CardDebitDetails, PostalTransferDetails};
    use crate::outcome::Recovery;
    use crate::plan::BillingPeriod;
    use crate::store::{InMemoryRecordStore, Record, RecordStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedGateway {
        response: Result<GatewayResponse, &'static str>,
        delay: Duration,
        calls: AtomicUsize,
        attempts: Mutex<Vec<String>>,
    }

    impl ScriptedGateway {
        fn approving() -> Self {
            Self::answering(Ok(GatewayResponse::Approved {
                reference: "sim_ok".into(),
            }))
        }

        fn answering(response: Result<GatewayResponse, &'static str>) -> Self {
            Self {
                response,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                attempts: Mutex::new(Vec::new()),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PaymentGateway for ScriptedGateway {
        async fn submit(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.attempts.lock().unwrap().push(request.attempt_id.clone());
            tokio::time::sleep(self.delay).await;
            self.response
                .clone()
                .map_err(|e| GatewayError::Transport(e.to_string()))
        }

        fn gateway_name(&self) -> &'static str {
            "scripted"
        }
    }

    #[derive(Default)]
    struct RecordingNavigator {
        visits: Mutex<Vec<Destination>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, destination: &Destination) {
            self.visits.lock().unwrap().push(destination.clone());
        }
    }

    fn card_form() -> CheckoutForm {
        CheckoutForm::with_details(PaymentMethodDetails::CardDebit(CardDebitDetails {
            card_holder_name: "Amira Ben Salah".into(),
            card_number: "4242 4242 4242 4242".into(),
            expiry_date: "12/27".into(),
            phone_number: "22123456".into(),
        }))
    }

    fn contact() -> BillingContact {
        BillingContact {
            name: "Amira Ben Salah".into(),
            email: "amira@example.tn".into(),
            address: "12 Rue de Marseille, Tunis".into(),
            phone: "22123456".into(),
        }
    }

    struct Harness {
        machine: CheckoutStateMachine,
        gateway: Arc<ScriptedGateway>,
        store: Arc<InMemoryRecordStore>,
        navigator: Arc<RecordingNavigator>,
    }

    fn harness(intent: CheckoutIntent, form: CheckoutForm, gateway: ScriptedGateway) -> Harness {
        harness_with(intent, form, gateway, Arc::new(InMemoryRecordStore::new()), MachineConfig::default())
    }

    fn harness_with(
        intent: CheckoutIntent,
        form: CheckoutForm,
        gateway: ScriptedGateway,
        store: Arc<InMemoryRecordStore>,
        config: MachineConfig,
    ) -> Harness {
        let gateway = Arc::new(gateway);
        let navigator = Arc::new(RecordingNavigator::default());
        let machine = CheckoutStateMachine::with_parts(
            intent,
            form,
            gateway.clone(),
            store.clone(),
            navigator.clone(),
            config,
        );
        Harness {
            machine,
            gateway,
            store,
            navigator,
        }
    }

    #[tokio::test]
    async fn test_register_payout_method_success() {
        let h = harness(
            CheckoutIntent::RegisterPayoutMethod,
            card_form(),
            ScriptedGateway::approving(),
        );

        let outcome = h.machine.submit().await.unwrap();
        assert_eq!(outcome, SubmissionOutcome::Success("sim_ok".into()));

        let methods = h.store.payment_methods().await.unwrap();
        assert_eq!(methods.len(), 1);
        assert!(methods[0].is_default);
        assert_eq!(methods[0].gateway_reference.as_deref(), Some("sim_ok"));

        match h.machine.state() {
            CheckoutState::Succeeded { record_id, .. } => assert_eq!(record_id, methods[0].id),
            other => panic!("unexpected state: {other:?}"),
        }
        assert_eq!(*h.navigator.visits.lock().unwrap(), vec![Destination::PayoutMethods]);
    }

    #[tokio::test]
    async fn test_validation_failure_never_reaches_gateway() {
        let mut form = card_form();
        form.set_field("cardNumber", "4242".into()).unwrap();
        let h = harness(CheckoutIntent::RegisterPayoutMethod, form, ScriptedGateway::approving());

        let outcome = h.machine.submit().await.unwrap();
        match &outcome {
            SubmissionOutcome::ValidationFailed(errors) => {
                assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["cardNumber"]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(h.gateway.calls(), 0);
        assert!(h.store.list().await.unwrap().is_empty());
        assert_eq!(
            h.machine.state().error().map(ErrorKind::recovery),
            Some(Recovery::CorrectFields)
        );
    }

    #[tokio::test]
    async fn test_edit_clears_only_that_field_and_returns_to_idle() {
        let form = CheckoutForm::new(crate::method::PaymentMethodKind::CardDebit);
        let h = harness(CheckoutIntent::RegisterPayoutMethod, form, ScriptedGateway::approving());

        h.machine.submit().await.unwrap();
        assert_eq!(h.machine.field_errors().len(), 4);

        h.machine.edit_field("cardNumber", "4242424242424242").unwrap();
        assert_eq!(h.machine.state(), CheckoutState::Idle);

        let errors = h.machine.field_errors();
        assert!(!errors.contains("cardNumber"));
        assert_eq!(errors.len(), 3);

        match h.machine.form().instrument.details() {
            Some(PaymentMethodDetails::CardDebit(d)) => {
                assert_eq!(d.card_number, "4242 4242 4242 4242")
            }
            other => panic!("unexpected instrument: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_field_edit_rejected() {
        let h = harness(CheckoutIntent::RegisterPayoutMethod, card_form(), ScriptedGateway::approving());
        let err = h.machine.edit_field("ccpNumber", "1234567").unwrap_err();
        assert!(matches!(err, CheckoutError::UnknownField { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_double_submit_appends_once() {
        let h = harness(
            CheckoutIntent::RegisterPayoutMethod,
            card_form(),
            ScriptedGateway::approving().with_delay(Duration::from_millis(200)),
        );

        let (first, second) = tokio::join!(h.machine.submit(), h.machine.submit());

        assert_eq!(first.unwrap(), SubmissionOutcome::Success("sim_ok".into()));
        assert!(matches!(second, Err(CheckoutError::SubmissionInProgress)));
        assert_eq!(h.gateway.calls(), 1);
        assert_eq!(h.store.list().await.unwrap().len(), 1);
        assert_eq!(h.navigator.visits.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_attempt_id_across_machines_stores_once() {
        let store = Arc::new(InMemoryRecordStore::new());
        let first = harness_with(
            CheckoutIntent::RegisterPayoutMethod,
            card_form(),
            ScriptedGateway::approving(),
            store.clone(),
            MachineConfig::default(),
        );
        let second = harness_with(
            CheckoutIntent::RegisterPayoutMethod,
            card_form(),
            ScriptedGateway::approving(),
            store.clone(),
            MachineConfig::default(),
        );

        let a = first.machine.with_attempt_id("key-1");
        let b = second.machine.with_attempt_id("key-1");
        assert!(a.submit().await.unwrap().is_success());
        assert!(b.submit().await.unwrap().is_success());

        assert_eq!(store.list().await.unwrap().len(), 1);
        assert_eq!(*first.gateway.attempts.lock().unwrap(), vec!["key-1".to_string()]);
        assert_eq!(a.state(), b.state());
    }

    #[tokio::test]
    async fn test_resubmit_after_success_is_refused() {
        let h = harness(CheckoutIntent::RegisterPayoutMethod, card_form(), ScriptedGateway::approving());

        assert!(h.machine.submit().await.unwrap().is_success());
        let again = h.machine.submit().await;

        assert!(matches!(again, Err(CheckoutError::AlreadySubmitted)));
        assert_eq!(h.store.list().await.unwrap().len(), 1);
        assert_eq!(h.gateway.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_while_submitting_rejected() {
        let h = harness(
            CheckoutIntent::RegisterPayoutMethod,
            card_form(),
            ScriptedGateway::approving().with_delay(Duration::from_millis(100)),
        );

        let machine = h.machine.clone();
        let pending = tokio::spawn(async move { machine.submit().await });
        tokio::task::yield_now().await;

        assert_eq!(h.machine.state(), CheckoutState::Submitting);
        assert!(matches!(
            h.machine.edit_field("cardHolderName", "X"),
            Err(CheckoutError::SubmissionInProgress)
        ));

        assert!(pending.await.unwrap().unwrap().is_success());
    }

    #[tokio::test]
    async fn test_declined_then_retry_with_new_method() {
        let h = harness(
            CheckoutIntent::RegisterPayoutMethod,
            card_form(),
            ScriptedGateway::answering(Ok(GatewayResponse::Rejected {
                code: "declined".into(),
            })),
        );

        assert_eq!(h.machine.submit().await.unwrap(), SubmissionOutcome::Declined);
        let state = h.machine.state();
        assert_eq!(
            state.error().map(ErrorKind::recovery),
            Some(Recovery::RetryWithDifferentMethod)
        );
        assert!(h.store.list().await.unwrap().is_empty());
        assert!(h.navigator.visits.lock().unwrap().is_empty());

        // Failed is terminal for the attempt only: resubmitting is allowed
        assert_eq!(h.machine.submit().await.unwrap(), SubmissionOutcome::Declined);
        assert_eq!(h.gateway.calls(), 2);
    }

    #[tokio::test]
    async fn test_expired_card_and_transport_errors() {
        let h = harness(
            CheckoutIntent::RegisterPayoutMethod,
            card_form(),
            ScriptedGateway::answering(Ok(GatewayResponse::Rejected {
                code: "expired_card".into(),
            })),
        );
        assert_eq!(h.machine.submit().await.unwrap(), SubmissionOutcome::ExpiredCard);
        assert_eq!(
            h.machine.state().error().map(ErrorKind::recovery),
            Some(Recovery::ReenterCardDetails)
        );

        let h = harness(
            CheckoutIntent::RegisterPayoutMethod,
            card_form(),
            ScriptedGateway::answering(Err("connection reset")),
        );
        assert_eq!(h.machine.submit().await.unwrap(), SubmissionOutcome::NetworkError);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_network_error_and_retry_reuses_attempt() {
        let config = MachineConfig {
            submit_timeout: Duration::from_secs(1),
            ..MachineConfig::default()
        };
        let h = harness_with(
            CheckoutIntent::RegisterPayoutMethod,
            card_form(),
            ScriptedGateway::approving().with_delay(Duration::from_secs(60)),
            Arc::new(InMemoryRecordStore::new()),
            config,
        );

        assert_eq!(h.machine.submit().await.unwrap(), SubmissionOutcome::NetworkError);
        assert_eq!(
            h.machine.state().error().map(ErrorKind::recovery),
            Some(Recovery::RetrySameSubmission)
        );

        assert_eq!(h.machine.submit().await.unwrap(), SubmissionOutcome::NetworkError);
        let attempts = h.gateway.attempts.lock().unwrap().clone();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0], attempts[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_submission_still_completes_once() {
        let h = harness(
            CheckoutIntent::RegisterPayoutMethod,
            card_form(),
            ScriptedGateway::approving().with_delay(Duration::from_millis(500)),
        );

        // The UI gives up waiting and navigates away
        let gave_up = tokio::time::timeout(Duration::from_millis(10), h.machine.submit()).await;
        assert!(gave_up.is_err());
        h.machine.abandon();

        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(matches!(h.machine.state(), CheckoutState::Succeeded { .. }));
        assert_eq!(h.store.list().await.unwrap().len(), 1);
        assert!(h.navigator.visits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_with_saved_method() {
        let store = Arc::new(InMemoryRecordStore::new());
        let saved = store
            .append(NewRecord::new(RecordDraft::PaymentMethod(PaymentMethodDraft {
                details: PaymentMethodDetails::PostalTransfer(PostalTransferDetails {
                    ccp_number: "1234567".into(),
                    ..Default::default()
                }),
                gateway_reference: None,
            })))
            .await
            .unwrap();

        let plan = Plan::recurring("pro", "Pro", Price::new(49.9, Currency::TND), BillingPeriod::Monthly);
        let form = CheckoutForm::with_saved_method(saved.clone()).with_contact(contact());
        let h = harness_with(
            CheckoutIntent::Subscribe {
                resource_id: "llama-tn".into(),
                plan,
            },
            form,
            ScriptedGateway::approving(),
            store,
            MachineConfig::default(),
        );

        assert!(h.machine.submit().await.unwrap().is_success());

        let subs = h.store.subscriptions().await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].payment_method_ref, saved);
        assert_eq!(subs[0].plan_id, "pro");
        assert!(subs[0].next_billing_date.unwrap() > subs[0].start_date);
        assert_eq!(
            *h.navigator.visits.lock().unwrap(),
            vec![Destination::Subscription {
                id: subs[0].id.clone()
            }]
        );
    }

    #[tokio::test]
    async fn test_subscribe_requires_contact() {
        let plan = Plan::recurring("pro", "Pro", Price::new(49.9, Currency::TND), BillingPeriod::Monthly);
        let h = harness(
            CheckoutIntent::Subscribe {
                resource_id: "llama-tn".into(),
                plan,
            },
            card_form(),
            ScriptedGateway::approving(),
        );

        match h.machine.submit().await.unwrap() {
            SubmissionOutcome::ValidationFailed(errors) => {
                for field in BillingContact::FIELDS {
                    assert!(errors.contains(field), "{field}");
                }
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_saved_method() {
        let form = CheckoutForm::with_saved_method("pm_gone").with_contact(contact());
        let h = harness(
            CheckoutIntent::Purchase {
                resource_id: "dataset-arabic-speech".into(),
                price: Price::new(150.0, Currency::TND),
            },
            form,
            ScriptedGateway::approving(),
        );

        match h.machine.submit().await.unwrap() {
            SubmissionOutcome::ValidationFailed(errors) => {
                assert!(errors.contains(SAVED_METHOD_FIELD))
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(h.gateway.calls(), 0);
        assert!(h.machine.field_errors().contains(SAVED_METHOD_FIELD));
    }

    #[tokio::test]
    async fn test_purchase_appends_purchase_record() {
        let h = harness(
            CheckoutIntent::Purchase {
                resource_id: "dataset-arabic-speech".into(),
                price: Price::new(150.0, Currency::TND),
            },
            card_form().with_contact(contact()),
            ScriptedGateway::approving(),
        );

        assert!(h.machine.submit().await.unwrap().is_success());
        let records = h.store.list().await.unwrap();
        match records.as_slice() {
            [Record::Purchase(p)] => {
                assert_eq!(p.payment_method_ref, "Card •••• 4242");
                assert_eq!(p.price.amount, 150_000);
            }
            other => panic!("unexpected records: {other:?}"),
        }
    }

    #[test]
    fn test_validate_form_rejects_saved_method_for_registration() {
        let errors = validate_form(
            &CheckoutIntent::RegisterPayoutMethod,
            &PaymentMethodRegistry::default(),
            &CheckoutForm::with_saved_method("pm_1"),
        );
        assert!(errors.contains(SAVED_METHOD_FIELD));
    }
}
