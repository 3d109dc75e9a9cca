//! # Plan Catalog
//!
//! Subscription plans and one-time offers for models and datasets.
//! Loaded from `config/plans.toml`.

use crate::money::{Currency, Price};
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

/// How often a plan bills
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    /// Single purchase, no renewal
    #[default]
    OneTime,
    Monthly,
    Yearly,
}

impl BillingPeriod {
    pub fn is_recurring(&self) -> bool {
        !matches!(self, BillingPeriod::OneTime)
    }

    /// Next billing date after `from`; `None` for one-time plans.
    ///
    /// Month arithmetic clamps to the last day of shorter months
    /// (Jan 31 + 1 month = Feb 28/29).
    pub fn next_billing_date(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            BillingPeriod::OneTime => None,
            BillingPeriod::Monthly => from.checked_add_months(Months::new(1)),
            BillingPeriod::Yearly => from.checked_add_months(Months::new(12)),
        }
    }
}

/// A purchasable plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Unique plan identifier (e.g., "pro", "pro-annual")
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub price: Price,

    #[serde(default)]
    pub billing_period: BillingPeriod,

    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Plan {
    pub fn recurring(
        id: impl Into<String>,
        name: impl Into<String>,
        price: Price,
        period: BillingPeriod,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            price,
            billing_period: period,
            active: true,
        }
    }

    pub fn one_time(id: impl Into<String>, name: impl Into<String>, price: Price) -> Self {
        Self::recurring(id, name, price, BillingPeriod::OneTime)
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn is_recurring(&self) -> bool {
        self.billing_period.is_recurring()
    }
}

/// Plan catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanCatalog {
    #[serde(default)]
    pub plans: Vec<Plan>,
}

impl PlanCatalog {
    pub fn new() -> Self {
        Self { plans: Vec::new() }
    }

    /// Catalog used when no config file is present
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.add(
            Plan::recurring("basic", "Basic", Price::new(19.9, Currency::TND), BillingPeriod::Monthly)
                .with_description("Shared inference quota"),
        );
        catalog.add(
            Plan::recurring("pro", "Pro", Price::new(49.9, Currency::TND), BillingPeriod::Monthly)
                .with_description("Dedicated quota and priority support"),
        );
        catalog.add(
            Plan::recurring(
                "pro-annual",
                "Pro (annual)",
                Price::new(499.0, Currency::TND),
                BillingPeriod::Yearly,
            )
            .with_description("Pro billed yearly"),
        );
        catalog.add(
            Plan::one_time("dataset-license", "Dataset license", Price::new(150.0, Currency::TND))
                .with_description("Perpetual license for one dataset"),
        );
        catalog
    }

    pub fn add(&mut self, plan: Plan) {
        self.plans.push(plan);
    }

    pub fn get(&self, id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == id)
    }

    pub fn active_plans(&self) -> impl Iterator<Item = &Plan> {
        self.plans.iter().filter(|p| p.active)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_next_billing_date() {
        let start = Utc.with_ymd_and_hms(2026, 3, 15, 10, 0, 0).unwrap();
        assert_eq!(
            BillingPeriod::Monthly.next_billing_date(start),
            Some(Utc.with_ymd_and_hms(2026, 4, 15, 10, 0, 0).unwrap())
        );
        assert_eq!(
            BillingPeriod::Yearly.next_billing_date(start),
            Some(Utc.with_ymd_and_hms(2027, 3, 15, 10, 0, 0).unwrap())
        );
        assert_eq!(BillingPeriod::OneTime.next_billing_date(start), None);
    }

    #[test]
    fn test_month_end_clamps() {
        let start = Utc.with_ymd_and_hms(2028, 1, 31, 0, 0, 0).unwrap();
        assert_eq!(
            BillingPeriod::Monthly.next_billing_date(start),
            Some(Utc.with_ymd_and_hms(2028, 2, 29, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_catalog_from_toml() {
        let catalog = PlanCatalog::from_toml(
            r#"
            [[plans]]
            id = "starter"
            name = "Starter"
            billing_period = "monthly"
            price = { amount = 9900, currency = "tnd" }

            [[plans]]
            id = "legacy"
            name = "Legacy"
            active = false
            price = { amount = 1000, currency = "eur" }
            "#,
        )
        .unwrap();

        assert_eq!(catalog.plans.len(), 2);
        let starter = catalog.get("starter").unwrap();
        assert!(starter.is_recurring());
        assert_eq!(starter.price.display(), "9.900 TND");
        assert_eq!(catalog.get("legacy").unwrap().billing_period, BillingPeriod::OneTime);
        assert_eq!(catalog.active_plans().count(), 1);
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = PlanCatalog::builtin();
        assert!(catalog.get("pro-annual").unwrap().is_recurring());
        assert!(!catalog.get("dataset-license").unwrap().is_recurring());
    }
}
