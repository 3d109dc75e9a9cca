//! # Subscription and Purchase Records
//!
//! Records created by a successful checkout. They are never edited in place:
//! cancelling or changing plan produces a new record that points back at
//! the one it replaces.

use crate::money::Price;
use crate::plan::{BillingPeriod, Plan};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Cancelled,
}

/// A model subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub id: String,

    /// Subscribed model
    pub resource_id: String,

    pub plan_id: String,

    pub price: Price,

    pub billing_period: BillingPeriod,

    pub start_date: DateTime<Utc>,

    /// `start_date` + one billing period
    pub next_billing_date: Option<DateTime<Utc>>,

    /// Saved method id, or the masked label of a method entered at checkout
    pub payment_method_ref: String,

    /// Gateway reference of the capturing charge
    pub reference_id: String,

    #[serde(default)]
    pub status: SubscriptionStatus,

    /// Record this one replaces
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<String>,
}

impl SubscriptionRecord {
    /// New active subscription starting at `start_date`
    pub fn start(
        resource_id: impl Into<String>,
        plan: &Plan,
        payment_method_ref: impl Into<String>,
        reference_id: impl Into<String>,
        start_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            resource_id: resource_id.into(),
            plan_id: plan.id.clone(),
            price: plan.price,
            billing_period: plan.billing_period,
            start_date,
            next_billing_date: plan.billing_period.next_billing_date(start_date),
            payment_method_ref: payment_method_ref.into(),
            reference_id: reference_id.into(),
            status: SubscriptionStatus::Active,
            supersedes: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    /// Cancellation record; no further billing date
    pub fn cancelled(&self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status: SubscriptionStatus::Cancelled,
            next_billing_date: None,
            supersedes: Some(self.id.clone()),
            ..self.clone()
        }
    }

    /// Plan change record, starting a fresh period at `at`
    pub fn upgraded(&self, plan: &Plan, reference_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            supersedes: Some(self.id.clone()),
            ..Self::start(
                self.resource_id.clone(),
                plan,
                self.payment_method_ref.clone(),
                reference_id,
                at,
            )
        }
    }
}

/// A one-time dataset or model purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub id: String,
    pub resource_id: String,
    pub price: Price,
    pub payment_method_ref: String,
    pub reference_id: String,
    pub purchased_at: DateTime<Utc>,
}

impl PurchaseRecord {
    pub fn new(
        resource_id: impl Into<String>,
        price: Price,
        payment_method_ref: impl Into<String>,
        reference_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            resource_id: resource_id.into(),
            price,
            payment_method_ref: payment_method_ref.into(),
            reference_id: reference_id.into(),
            purchased_at: Utc::now(),
        }
    }
}

/// Newest record for a resource among a subscription history
pub fn current_subscription<'a>(
    history: impl IntoIterator<Item = &'a SubscriptionRecord>,
    resource_id: &str,
) -> Option<&'a SubscriptionRecord> {
    let records: Vec<_> = history
        .into_iter()
        .filter(|s| s.resource_id == resource_id)
        .collect();
    records
        .iter()
        .rev()
        .copied()
        .find(|candidate| {
            !records
                .iter()
                .any(|s| s.supersedes.as_deref() == Some(candidate.id.as_str()))
        })
}
