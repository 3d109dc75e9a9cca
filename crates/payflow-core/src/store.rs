//! # Record Store
//!
//! Append-only persistence for payment methods, subscriptions and
//! purchases. The store, not its callers, owns the default-method flag:
//! the first method ever appended becomes default, later ones never do
//! unless promoted through [`RecordStore::promote_default`]. Subscription
//! chains are kept the same way: a new subscription supersedes the active
//! one for its resource, and cancelling checks and appends in one step.

use crate::error::{CheckoutError, CheckoutResult};
use crate::method::{PaymentMethodDetails, PaymentMethodRecord};
use crate::subscription::{current_subscription, PurchaseRecord, SubscriptionRecord};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// A payment method before the store assigns its id and default flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodDraft {
    pub details: PaymentMethodDetails,
    pub gateway_reference: Option<String>,
}

/// Record payload handed to [`RecordStore::append`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordDraft {
    PaymentMethod(PaymentMethodDraft),
    Subscription(SubscriptionRecord),
    Purchase(PurchaseRecord),
}

/// An append request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    /// Submission attempt that produced the record. Appending twice with
    /// the same attempt returns the first id.
    pub attempt_id: Option<String>,
    pub draft: RecordDraft,
}

impl NewRecord {
    pub fn new(draft: RecordDraft) -> Self {
        Self {
            attempt_id: None,
            draft,
        }
    }

    pub fn for_attempt(attempt_id: impl Into<String>, draft: RecordDraft) -> Self {
        Self {
            attempt_id: Some(attempt_id.into()),
            draft,
        }
    }
}

/// A stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    PaymentMethod(PaymentMethodRecord),
    Subscription(SubscriptionRecord),
    Purchase(PurchaseRecord),
}

impl Record {
    pub fn id(&self) -> &str {
        match self {
            Record::PaymentMethod(r) => &r.id,
            Record::Subscription(r) => &r.id,
            Record::Purchase(r) => &r.id,
        }
    }
}

/// Persistence boundary consumed by the checkout engine
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append a record and return its id. Must be atomic with respect to
    /// concurrent appends (the default flag is decided inside the call).
    async fn append(&self, record: NewRecord) -> CheckoutResult<String>;

    /// All records, in insertion order
    async fn list(&self) -> CheckoutResult<Vec<Record>>;

    /// The default payment method, if any method exists
    async fn find_default(&self) -> CheckoutResult<Option<PaymentMethodRecord>>;

    /// Make `id` the default payment method
    async fn promote_default(&self, id: &str) -> CheckoutResult<PaymentMethodRecord>;

    /// Append a cancellation for subscription `id`, which must be the
    /// active subscription for its resource at the time of the call
    async fn cancel_subscription(&self, id: &str) -> CheckoutResult<SubscriptionRecord>;

    async fn payment_methods(&self) -> CheckoutResult<Vec<PaymentMethodRecord>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter_map(|r| match r {
                Record::PaymentMethod(m) => Some(m),
                _ => None,
            })
            .collect())
    }

    async fn payment_method(&self, id: &str) -> CheckoutResult<Option<PaymentMethodRecord>> {
        Ok(self.payment_methods().await?.into_iter().find(|m| m.id == id))
    }

    async fn subscriptions(&self) -> CheckoutResult<Vec<SubscriptionRecord>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter_map(|r| match r {
                Record::Subscription(s) => Some(s),
                _ => None,
            })
            .collect())
    }
}

/// Type alias for a shared store (dynamic dispatch)
pub type BoxedRecordStore = Arc<dyn RecordStore>;

#[derive(Debug, Default)]
struct StoreInner {
    records: Vec<Record>,
    /// attempt id -> record id
    attempts: HashMap<String, String>,
}

impl StoreInner {
    fn current_subscription(&self, resource_id: &str) -> Option<&SubscriptionRecord> {
        current_subscription(
            self.records.iter().filter_map(|r| match r {
                Record::Subscription(s) => Some(s),
                _ => None,
            }),
            resource_id,
        )
    }
}

/// Mutex-guarded in-memory store, one per owner
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> CheckoutResult<std::sync::MutexGuard<'_, StoreInner>> {
        self.inner
            .lock()
            .map_err(|e| CheckoutError::Store(format!("store lock poisoned: {}", e)))
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    #[instrument(skip(self, record), fields(attempt_id = ?record.attempt_id))]
    async fn append(&self, record: NewRecord) -> CheckoutResult<String> {
        let mut inner = self.lock()?;

        if let Some(existing) = record
            .attempt_id
            .as_ref()
            .and_then(|attempt| inner.attempts.get(attempt))
        {
            debug!("Attempt already recorded as {}", existing);
            return Ok(existing.clone());
        }

        let stored = match record.draft {
            RecordDraft::PaymentMethod(draft) => {
                let is_default = !inner
                    .records
                    .iter()
                    .any(|r| matches!(r, Record::PaymentMethod(_)));
                let method = PaymentMethodRecord {
                    id: format!("pm_{}", Uuid::new_v4().simple()),
                    kind: draft.details.kind(),
                    details: draft.details,
                    is_default,
                    gateway_reference: draft.gateway_reference,
                    created_at: Utc::now(),
                };
                info!(
                    "Stored payment method {} ({}), default={}",
                    method.id,
                    method.masked_label(),
                    method.is_default
                );
                Record::PaymentMethod(method)
            }
            RecordDraft::Subscription(mut sub) => {
                if sub.supersedes.is_none() {
                    sub.supersedes = inner
                        .current_subscription(&sub.resource_id)
                        .filter(|current| current.is_active())
                        .map(|current| current.id.clone());
                }
                info!(
                    "Stored subscription {} for {} (supersedes {:?})",
                    sub.id, sub.resource_id, sub.supersedes
                );
                Record::Subscription(sub)
            }
            RecordDraft::Purchase(purchase) => {
                info!("Stored purchase {} for {}", purchase.id, purchase.resource_id);
                Record::Purchase(purchase)
            }
        };

        let id = stored.id().to_string();
        if let Some(attempt) = record.attempt_id {
            inner.attempts.insert(attempt, id.clone());
        }
        inner.records.push(stored);
        Ok(id)
    }

    async fn list(&self) -> CheckoutResult<Vec<Record>> {
        Ok(self.lock()?.records.clone())
    }

    async fn find_default(&self) -> CheckoutResult<Option<PaymentMethodRecord>> {
        Ok(self.lock()?.records.iter().find_map(|r| match r {
            Record::PaymentMethod(m) if m.is_default => Some(m.clone()),
            _ => None,
        }))
    }

    #[instrument(skip(self))]
    async fn promote_default(&self, id: &str) -> CheckoutResult<PaymentMethodRecord> {
        let mut inner = self.lock()?;

        let exists = inner
            .records
            .iter()
            .any(|r| matches!(r, Record::PaymentMethod(m) if m.id == id));
        if !exists {
            return Err(CheckoutError::RecordNotFound { id: id.to_string() });
        }

        let mut promoted = None;
        for record in inner.records.iter_mut() {
            if let Record::PaymentMethod(m) = record {
                m.is_default = m.id == id;
                if m.is_default {
                    promoted = Some(m.clone());
                }
            }
        }

        info!("Promoted payment method {} to default", id);
        promoted.ok_or_else(|| CheckoutError::Internal("promoted record vanished".to_string()))
    }

    #[instrument(skip(self))]
    async fn cancel_subscription(&self, id: &str) -> CheckoutResult<SubscriptionRecord> {
        let mut inner = self.lock()?;

        let target = inner
            .records
            .iter()
            .find_map(|r| match r {
                Record::Subscription(s) if s.id == id => Some(s.clone()),
                _ => None,
            })
            .ok_or_else(|| CheckoutError::RecordNotFound { id: id.to_string() })?;

        let is_current = inner
            .current_subscription(&target.resource_id)
            .is_some_and(|current| current.id == id && current.is_active());
        if !is_current {
            return Err(CheckoutError::InvalidRequest(format!(
                "Subscription {} is not the active subscription for {}",
                id, target.resource_id
            )));
        }

        let cancellation = target.cancelled();
        inner.records.push(Record::Subscription(cancellation.clone()));
        info!("Cancelled subscription {} for {}", id, target.resource_id);
        Ok(cancellation)
    }
}
