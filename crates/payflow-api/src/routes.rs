//! # Routes
//!
//! Axum router configuration for the payment API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Forms (stateless):
///   - GET  /api/v1/methods - List method kinds with schemas
///   - GET  /api/v1/methods/{kind} - Schema and blank details for one kind
///   - POST /api/v1/format - Keystroke formatting
///   - POST /api/v1/validate - Validate method details
///   - GET  /api/v1/plans - Active plans
///
/// - Per owner:
///   - GET/POST /api/v1/{owner}/payment-methods - List / register
///   - GET  /api/v1/{owner}/payment-methods/default - Default method
///   - POST /api/v1/{owner}/payment-methods/{id}/default - Promote
///   - POST /api/v1/{owner}/checkout - Subscription or purchase
///   - GET  /api/v1/{owner}/records - All records
///   - POST /api/v1/{owner}/subscriptions/{id}/cancel - Cancel a subscription
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let form_routes = Router::new()
        .route("/methods", get(handlers::list_methods))
        .route("/methods/{kind}", get(handlers::get_method))
        .route("/format", post(handlers::format_value))
        .route("/validate", post(handlers::validate_details))
        .route("/plans", get(handlers::list_plans));

    let owner_routes = Router::new()
        .route(
            "/{owner}/payment-methods",
            get(handlers::list_payment_methods).post(handlers::register_payment_method),
        )
        .route(
            "/{owner}/payment-methods/default",
            get(handlers::get_default_payment_method),
        )
        .route(
            "/{owner}/payment-methods/{id}/default",
            post(handlers::promote_default_payment_method),
        )
        .route("/{owner}/checkout", post(handlers::checkout))
        .route("/{owner}/records", get(handlers::list_records))
        .route(
            "/{owner}/subscriptions/{id}/cancel",
            post(handlers::cancel_subscription),
        );

    let api_routes = Router::new().merge(form_routes).merge(owner_routes);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
