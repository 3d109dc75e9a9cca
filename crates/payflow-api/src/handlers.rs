//! # Request Handlers
//!
//! Axum request handlers for the payment API.
//! Every submission builds a fresh `CheckoutStateMachine` over the owner's
//! record store and reports the classified outcome. Clients send an
//! `Idempotency-Key` header to make a repeated POST replay the first attempt
//! instead of charging again.

use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use payflow_core::{
    format_field, BillingContact, CheckoutError, CheckoutForm, CheckoutIntent, CheckoutState,
    CheckoutStateMachine, Destination, FieldErrors, Instrument, Navigator, PaymentMethodDetails,
    PaymentMethodKind, PaymentMethodRecord, Price, PurchaseRecord, Record, RecordStore, Recovery,
    SubmissionOutcome, SubscriptionRecord,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, instrument};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Format request (one keystroke)
#[derive(Debug, Deserialize)]
pub struct FormatRequest {
    pub field: String,
    #[serde(default)]
    pub value: String,
}

/// Format response
#[derive(Debug, Serialize)]
pub struct FormatResponse {
    pub field: String,
    pub value: String,
}

/// Validation response
#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub errors: FieldErrors,
}

/// Subscription or purchase checkout request
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Model or dataset being paid for
    pub resource_id: String,
    /// Catalog plan (subscriptions and catalog one-time offers)
    #[serde(default)]
    pub plan_id: Option<String>,
    /// Ad-hoc price for a one-time purchase without a plan
    #[serde(default)]
    pub price: Option<Price>,
    /// Billing contact block
    #[serde(default)]
    pub contact: BillingContact,
    /// Saved method reference or freshly entered details
    pub instrument: Instrument,
}

/// Result of one submission
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub outcome: SubmissionOutcome,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery: Option<Recovery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "FieldErrors::is_empty")]
    pub field_errors: FieldErrors,
    /// Page the client should navigate to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

/// Stored payment method as exposed over HTTP; the instrument number is
/// never returned in full
#[derive(Debug, Serialize)]
pub struct PaymentMethodSummary {
    pub id: String,
    pub kind: PaymentMethodKind,
    pub label: String,
    pub is_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_reference: Option<String>,
    pub created_at: String,
}

impl From<&PaymentMethodRecord> for PaymentMethodSummary {
    fn from(record: &PaymentMethodRecord) -> Self {
        Self {
            id: record.id.clone(),
            kind: record.kind,
            label: record.masked_label(),
            is_default: record.is_default,
            gateway_reference: record.gateway_reference.clone(),
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

/// Record listing entry
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordView {
    PaymentMethod(PaymentMethodSummary),
    Subscription(SubscriptionRecord),
    Purchase(PurchaseRecord),
}

impl From<&Record> for RecordView {
    fn from(record: &Record) -> Self {
        match record {
            Record::PaymentMethod(r) => RecordView::PaymentMethod(r.into()),
            Record::Subscription(r) => RecordView::Subscription(r.clone()),
            Record::Purchase(r) => RecordView::Purchase(r.clone()),
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn checkout_error_to_response(err: CheckoutError) -> ApiError {
    let code = err.status_code();
    let mut response = ErrorResponse::new(err.to_string(), code);
    if err.is_retryable() {
        response = response.with_details("retryable");
    }
    (StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), Json(response))
}

// =============================================================================
// Navigation capture
// =============================================================================

/// Keeps the navigation target so it can be returned as `redirect`
#[derive(Default)]
struct RedirectCapture {
    destination: Mutex<Option<Destination>>,
}

impl RedirectCapture {
    fn take(&self) -> Option<Destination> {
        self.destination
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Navigator for RedirectCapture {
    fn navigate(&self, destination: &Destination) {
        info!("Redirecting client to {}", destination.path());
        *self.destination.lock().unwrap_or_else(PoisonError::into_inner) = Some(destination.clone());
    }
}

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Attempt id derived from the client's idempotency key, scoped to the owner
fn attempt_id_from(headers: &HeaderMap, owner: &str) -> Result<Option<String>, ApiError> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };

    let key = value
        .to_str()
        .map(str::trim)
        .ok()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            checkout_error_to_response(CheckoutError::InvalidRequest(
                "Idempotency-Key must be a non-empty ASCII string".to_string(),
            ))
        })?;

    Ok(Some(format!("{}:{}", owner, key)))
}

/// Status code reported for each outcome
fn outcome_status(outcome: &SubmissionOutcome, success: StatusCode) -> StatusCode {
    match outcome {
        SubmissionOutcome::Success(_) => success,
        SubmissionOutcome::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SubmissionOutcome::Declined
        | SubmissionOutcome::InsufficientFunds
        | SubmissionOutcome::ExpiredCard => StatusCode::PAYMENT_REQUIRED,
        SubmissionOutcome::NetworkError => StatusCode::BAD_GATEWAY,
    }
}

/// Drive one form through the state machine (shared logic)
async fn run_checkout(
    state: &AppState,
    owner: &str,
    intent: CheckoutIntent,
    form: CheckoutForm,
    attempt_id: Option<String>,
    success: StatusCode,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let store = state.store_for(owner).await;
    let capture = Arc::new(RedirectCapture::default());

    let mut machine = CheckoutStateMachine::with_parts(
        intent,
        form,
        state.gateway.clone(),
        store,
        capture.clone(),
        state.config.machine_config(),
    );
    if let Some(attempt_id) = attempt_id {
        machine = machine.with_attempt_id(attempt_id);
    }

    let outcome = machine.submit().await.map_err(|e| {
        error!("Submission refused: {}", e);
        checkout_error_to_response(e)
    })?;

    let record_id = match machine.state() {
        CheckoutState::Succeeded { record_id, .. } => Some(record_id),
        _ => None,
    };
    let failure = outcome.error_kind();

    let response = CheckoutResponse {
        success: outcome.is_success(),
        reference_id: outcome.reference_id().map(str::to_string),
        record_id,
        recovery: failure.as_ref().map(|k| k.recovery()),
        message: failure.as_ref().map(|k| k.user_message().to_string()),
        field_errors: machine.field_errors(),
        redirect: capture.take().map(|d| d.path()),
        outcome,
    };

    Ok((outcome_status(&response.outcome, success), Json(response)))
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "payflow",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// List payment method kinds with their schemas
pub async fn list_methods(State(state): State<AppState>) -> impl IntoResponse {
    let methods = state.registry.entries();
    Json(serde_json::json!({
        "methods": methods,
        "count": methods.len()
    }))
}

/// Schema and blank form data for one kind
pub async fn get_method(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let kind: PaymentMethodKind = kind.parse().map_err(|_| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("Payment method not found: {}", kind), 404)),
        )
    })?;

    let entry = state.registry.get(kind);
    Ok(Json(serde_json::json!({
        "method": entry,
        "default_details": entry.default_details()
    })))
}

/// Apply the keystroke formatter for a field
pub async fn format_value(Json(request): Json<FormatRequest>) -> Json<FormatResponse> {
    let value = format_field(&request.field, &request.value);
    Json(FormatResponse {
        field: request.field,
        value,
    })
}

/// Validate method details without submitting
pub async fn validate_details(
    State(state): State<AppState>,
    Json(details): Json<PaymentMethodDetails>,
) -> Json<ValidateResponse> {
    let errors = state.registry.validate(&details);
    Json(ValidateResponse {
        valid: errors.is_empty(),
        errors,
    })
}

/// Active plans
pub async fn list_plans(State(state): State<AppState>) -> impl IntoResponse {
    let plans: Vec<_> = state.catalog.active_plans().collect();
    Json(serde_json::json!({
        "plans": plans,
        "count": plans.len()
    }))
}

/// Payout method onboarding
#[instrument(skip(state, headers, details), fields(owner = %owner, kind = %details.kind()))]
pub async fn register_payment_method(
    State(state): State<AppState>,
    Path(owner): Path<String>,
    headers: HeaderMap,
    Json(details): Json<PaymentMethodDetails>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let attempt_id = attempt_id_from(&headers, &owner)?;
    info!("Registering {}", details.masked_label());
    run_checkout(
        &state,
        &owner,
        CheckoutIntent::RegisterPayoutMethod,
        CheckoutForm::with_details(details),
        attempt_id,
        StatusCode::CREATED,
    )
    .await
}

/// List an owner's payment methods
pub async fn list_payment_methods(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&owner).await;
    let methods: Vec<PaymentMethodSummary> = store
        .payment_methods()
        .await
        .map_err(checkout_error_to_response)?
        .iter()
        .map(PaymentMethodSummary::from)
        .collect();

    Ok(Json(serde_json::json!({
        "owner": owner,
        "payment_methods": methods,
        "count": methods.len()
    })))
}

/// The owner's default payment method
pub async fn get_default_payment_method(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<PaymentMethodSummary>, ApiError> {
    let store = state.store_for(&owner).await;
    let record = store
        .find_default()
        .await
        .map_err(checkout_error_to_response)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(
                    format!("No payment method registered for {}", owner),
                    404,
                )),
            )
        })?;

    Ok(Json(PaymentMethodSummary::from(&record)))
}

/// Make a stored method the default
#[instrument(skip(state), fields(owner = %owner, id = %id))]
pub async fn promote_default_payment_method(
    State(state): State<AppState>,
    Path((owner, id)): Path<(String, String)>,
) -> Result<Json<PaymentMethodSummary>, ApiError> {
    let store = state.store_for(&owner).await;
    let record = store
        .promote_default(&id)
        .await
        .map_err(checkout_error_to_response)?;

    info!("Promoted {} to default", id);
    Ok(Json(PaymentMethodSummary::from(&record)))
}

/// Subscription or purchase checkout
#[instrument(skip(state, headers, request), fields(owner = %owner, resource = %request.resource_id))]
pub async fn checkout(
    State(state): State<AppState>,
    Path(owner): Path<String>,
    headers: HeaderMap,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let attempt_id = attempt_id_from(&headers, &owner)?;
    let intent = match (&request.plan_id, request.price) {
        (Some(plan_id), _) => {
            let plan = state
                .catalog
                .get(plan_id)
                .ok_or_else(|| {
                    checkout_error_to_response(CheckoutError::UnknownPlan {
                        plan_id: plan_id.clone(),
                    })
                })?;

            if !plan.active {
                return Err(checkout_error_to_response(CheckoutError::InvalidRequest(
                    format!("Plan is not available: {}", plan_id),
                )));
            }

            CheckoutIntent::Subscribe {
                resource_id: request.resource_id.clone(),
                plan: plan.clone(),
            }
        }
        (None, Some(price)) if price.is_positive() => CheckoutIntent::Purchase {
            resource_id: request.resource_id.clone(),
            price,
        },
        _ => {
            return Err(checkout_error_to_response(CheckoutError::InvalidRequest(
                "Provide 'plan_id' or a positive 'price'".to_string(),
            )));
        }
    };

    let form = CheckoutForm {
        contact: request.contact,
        instrument: request.instrument,
    };

    run_checkout(&state, &owner, intent, form, attempt_id, StatusCode::OK).await
}

/// All records of an owner, oldest first
pub async fn list_records(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&owner).await;
    let records: Vec<RecordView> = store
        .list()
        .await
        .map_err(checkout_error_to_response)?
        .iter()
        .map(RecordView::from)
        .collect();

    Ok(Json(serde_json::json!({
        "owner": owner,
        "records": records,
        "count": records.len()
    })))
}

/// Cancel a subscription by appending a cancellation record
#[instrument(skip(state), fields(owner = %owner, id = %id))]
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Path((owner, id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<SubscriptionRecord>), ApiError> {
    let store = state.store_for(&owner).await;
    let cancellation = store.cancel_subscription(&id).await.map_err(|e| {
        error!("Cancellation refused: {}", e);
        checkout_error_to_response(e)
    })?;

    Ok((StatusCode::CREATED, Json(cancellation)))
}
