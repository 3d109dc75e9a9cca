//! # Payflow RS
//!
//! Payment-method onboarding and checkout engine for the model marketplace.
//!
//! ## Usage
//!
//! ```bash
//! # Optional environment variables
//! export PAYFLOW_SUBMIT_TIMEOUT_MS=15000
//! export PAYFLOW_SIMULATED_LATENCY_MS=300
//! export PAYFLOW_IBAN_PREFIX=TN
//!
//! # Run the server
//! payflow
//! ```

use payflow_api::{routes, state::AppState};
use payflow_core::PaymentGateway;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Plans loaded: {}", state.catalog.plans.len());
    info!("Payment gateway: {}", state.gateway.gateway_name());
    info!("Submit timeout: {:?}", state.config.submit_timeout);

    let app = routes::create_router(state);

    info!("Payflow starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Methods: GET http://{}/api/v1/methods", addr);
        info!("Checkout: POST http://{}/api/v1/{{owner}}/checkout", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  Payflow RS
  ━━━━━━━━━━━━━━━━━━━━━━━
  Checkout state machine
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
