//! Web server module.
//!
//! Exposes the registry over HTTP:
//! - `GET /api/:flows_user/:flow_id/listen` hands a flow its opaque key
//! - `GET /api/event/:l_key` resolves an inbound key back to its flow
//! - `GET /api/auth` completes the Slack OAuth installation

pub mod error;
pub mod handlers;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ErrorResponse};
pub use handlers::{
    event, event_query, health, listen, listen_query, slack_auth, AppState, AuthResponse,
    HealthResponse, ListenResponse,
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/listen", get(listen_query))
        .route("/api/event", get(event_query))
        .route("/api/event/:l_key", get(event))
        .route("/api/auth", get(slack_auth))
        .route("/api/:flows_user/:flow_id/listen", get(listen))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
