//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the gateway, plan catalog, method registry and per-owner record stores.

use payflow_core::{
    BoxedPaymentGateway, InMemoryRecordStore, MachineConfig, PaymentMethodRegistry, PlanCatalog,
    ValidationRules,
};
use payflow_gateway::PaymentGatewaySimulator;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Bound on one gateway call
    pub submit_timeout: Duration,
    /// Required IBAN country prefix
    pub iban_prefix: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let submit_timeout_ms = match std::env::var("PAYFLOW_SUBMIT_TIMEOUT_MS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                anyhow::anyhow!("PAYFLOW_SUBMIT_TIMEOUT_MS must be a number, got '{}'", raw)
            })?,
            Err(_) => 15_000,
        };

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            submit_timeout: Duration::from_millis(submit_timeout_ms),
            iban_prefix: std::env::var("PAYFLOW_IBAN_PREFIX").unwrap_or_else(|_| "TN".to_string()),
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Rules and timeout handed to every checkout machine
    pub fn machine_config(&self) -> MachineConfig {
        MachineConfig {
            submit_timeout: self.submit_timeout,
            rules: ValidationRules::default().with_iban_prefix(self.iban_prefix.clone()),
            ..MachineConfig::default()
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            environment: "development".to_string(),
            submit_timeout: Duration::from_secs(15),
            iban_prefix: "TN".to_string(),
        }
    }
}

/// Record stores keyed by owner (developer or customer id)
pub type OwnerStores = Arc<RwLock<HashMap<String, Arc<InMemoryRecordStore>>>>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Gateway every checkout submits to
    pub gateway: BoxedPaymentGateway,
    /// Plan catalog
    pub catalog: Arc<PlanCatalog>,
    /// Method schemas and validators
    pub registry: PaymentMethodRegistry,
    /// Per-owner record stores
    pub stores: OwnerStores,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState with the simulated gateway
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let catalog = load_plan_catalog()?;

        let gateway = PaymentGatewaySimulator::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize gateway: {}", e))?;

        Ok(Self::with_parts(config, catalog, Arc::new(gateway)))
    }

    /// Assemble state from explicit parts
    pub fn with_parts(config: AppConfig, catalog: PlanCatalog, gateway: BoxedPaymentGateway) -> Self {
        let registry = PaymentMethodRegistry::new(config.machine_config().rules);
        Self {
            gateway,
            catalog: Arc::new(catalog),
            registry,
            stores: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// The owner's store, created on first use
    pub async fn store_for(&self, owner: &str) -> Arc<InMemoryRecordStore> {
        if let Some(store) = self.stores.read().await.get(owner) {
            return store.clone();
        }

        let mut stores = self.stores.write().await;
        stores
            .entry(owner.to_string())
            .or_insert_with(|| {
                tracing::debug!("Creating record store for owner {}", owner);
                Arc::new(InMemoryRecordStore::new())
            })
            .clone()
    }

    /// Number of owners with a store
    pub async fn owner_count(&self) -> usize {
        self.stores.read().await.len()
    }
}

/// Load plan catalog from config file
fn load_plan_catalog() -> anyhow::Result<PlanCatalog> {
    let config_paths = [
        "config/plans.toml",
        "../config/plans.toml",
        "../../config/plans.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = PlanCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded {} plans from {}", catalog.plans.len(), path);
            return Ok(catalog);
        }
    }

    tracing::warn!("No plan catalog found, using built-in plans");
    Ok(PlanCatalog::builtin())
}
