//! Web server module for the SNS webhook.
//!
//! This module provides:
//! - the SNS endpoint, mounted at `/` and `/webhooks/sns` for any method
//! - a `/health` check

pub mod handlers;

use axum::{
    routing::{any, get},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    handle_request, health, sns_webhook, AppState, HealthResponse, ERROR_BODY, FATAL_BODY,
    SUCCESS_BODY,
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", any(sns_webhook))
        .route("/webhooks/sns", any(sns_webhook))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
