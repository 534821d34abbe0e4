//! HTTP endpoint handlers.
//!
//! Handlers only extract and validate input, call the registry, and shape the
//! JSON response. Registry inputs can arrive either as path segments or as
//! query parameters.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::registry::{Binding, Registry, ResolvedBinding};
use crate::slack::SlackClient;
use crate::web::error::ApiError;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Registry,
    pub slack: Option<SlackClient>,
}

impl AppState {
    pub fn new(config: Config, registry: Registry, slack: Option<SlackClient>) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            slack,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Listen (ensure binding)
// =============================================================================

/// Optional query of the path-style listen endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct HandlerQuery {
    #[serde(default)]
    pub handler_fn: Option<String>,
}

/// Query of the query-style listen endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListenQuery {
    #[serde(default)]
    pub flows_user: Option<String>,
    #[serde(default)]
    pub flow_id: Option<String>,
    #[serde(default)]
    pub handler_fn: Option<String>,
}

/// Binding plus the public URL a flow advertises for it.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListenResponse {
    #[serde(flatten)]
    pub binding: Binding,
    pub webhook_url: String,
}

/// `GET /api/:flows_user/:flow_id/listen`
pub async fn listen(
    State(state): State<AppState>,
    Path((flows_user, flow_id)): Path<(String, String)>,
    Query(query): Query<HandlerQuery>,
) -> Result<Json<ListenResponse>, ApiError> {
    ensure(&state, &flows_user, &flow_id, query.handler_fn.as_deref()).await
}

/// `GET /api/listen?flows_user=&flow_id=`
pub async fn listen_query(
    State(state): State<AppState>,
    Query(query): Query<ListenQuery>,
) -> Result<Json<ListenResponse>, ApiError> {
    ensure(
        &state,
        query.flows_user.as_deref().unwrap_or_default(),
        query.flow_id.as_deref().unwrap_or_default(),
        query.handler_fn.as_deref(),
    )
    .await
}

async fn ensure(
    state: &AppState,
    flows_user: &str,
    flow_id: &str,
    handler_fn: Option<&str>,
) -> Result<Json<ListenResponse>, ApiError> {
    info!(
        flows_user = %flows_user,
        flow_id = %flow_id,
        has_handler = handler_fn.is_some(),
        "listen_received"
    );

    let binding = state
        .registry
        .ensure_binding(flows_user, flow_id, handler_fn)
        .await?;
    let webhook_url = format!("{}/{}", state.config.webhook_entry_url, binding.lookup_key);

    Ok(Json(ListenResponse {
        binding,
        webhook_url,
    }))
}

// =============================================================================
// Event (resolve key)
// =============================================================================

/// Query of the query-style event endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    #[serde(default)]
    pub l_key: Option<String>,
}

/// `GET /api/event/:l_key`
pub async fn event(
    State(state): State<AppState>,
    Path(l_key): Path<String>,
) -> Result<Json<ResolvedBinding>, ApiError> {
    resolve(&state, &l_key).await
}

/// `GET /api/event?l_key=`
pub async fn event_query(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Result<Json<ResolvedBinding>, ApiError> {
    resolve(&state, query.l_key.as_deref().unwrap_or_default()).await
}

async fn resolve(state: &AppState, l_key: &str) -> Result<Json<ResolvedBinding>, ApiError> {
    let resolved = state.registry.resolve(l_key).await?;
    info!(flows_user = %resolved.flows_user, flow_id = %resolved.flow_id, "event_resolved");
    Ok(Json(resolved))
}

// =============================================================================
// Slack OAuth
// =============================================================================

/// Query of the OAuth redirect.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    #[serde(default)]
    pub code: Option<String>,
}

/// Identity of the user who installed the Slack app.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: String,
    pub team: String,
    pub team_id: String,
}

/// `GET /api/auth?code=`
pub async fn slack_auth(
    State(state): State<AppState>,
    Query(query): Query<AuthQuery>,
) -> Result<Json<AuthResponse>, ApiError> {
    let slack = state.slack.as_ref().ok_or(ApiError::SlackDisabled)?;
    let code = query
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(ApiError::MissingField("code"))?;

    let team = slack.exchange_code(code).await?;

    Ok(Json(AuthResponse {
        user_id: team.user_id,
        team: team.team,
        team_id: team.team_id,
    }))
}
