//! # payflow-api
//!
//! HTTP API layer for payflow-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Form helpers (schemas, formatting, validation) for the checkout UI
//! - Payout-method onboarding and subscription/purchase checkout per owner
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/methods` | Method kinds and schemas |
//! | GET | `/api/v1/methods/{kind}` | One kind |
//! | POST | `/api/v1/format` | Format a field value |
//! | POST | `/api/v1/validate` | Validate method details |
//! | GET | `/api/v1/plans` | Active plans |
//! | GET/POST | `/api/v1/{owner}/payment-methods` | List / register methods |
//! | GET | `/api/v1/{owner}/payment-methods/default` | Default method |
//! | POST | `/api/v1/{owner}/payment-methods/{id}/default` | Promote to default |
//! | POST | `/api/v1/{owner}/checkout` | Subscribe or purchase |
//! | GET | `/api/v1/{owner}/records` | Owner's records |
//! | POST | `/api/v1/{owner}/subscriptions/{id}/cancel` | Cancel a subscription |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
