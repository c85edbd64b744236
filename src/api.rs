use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::error::StoreError;
use crate::mcp::{self, McpState};
use crate::store::{Prompt, PromptPatch, SharedStore};

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub name: String,
}

pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::DuplicateId(_) => StatusCode::CONFLICT,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::InvalidRecord(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("API error: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/prompts", get(list_prompts).post(add_prompt))
        .route(
            "/prompts/:id",
            get(get_prompt).patch(update_prompt).delete(delete_prompt),
        )
        .with_state(state)
}

/// The full HTTP surface: REST routes plus `POST /mcp`, behind the bearer
/// check when `api_key` is set.
pub fn app(state: AppState, mcp_state: McpState, api_key: Option<String>) -> Router {
    router(state)
        .merge(mcp::router(mcp_state))
        .layer(middleware::from_fn_with_state(api_key, auth_layer))
}

async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "name": state.name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_prompts(State(state): State<AppState>) -> Json<Vec<Prompt>> {
    Json(state.store.lock().await.list())
}

async fn get_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Prompt>, ApiError> {
    let store = state.store.lock().await;
    let prompt = store.get_by_id(&id).cloned().ok_or(StoreError::NotFound(id))?;
    Ok(Json(prompt))
}

async fn add_prompt(
    State(state): State<AppState>,
    Json(prompt): Json<Prompt>,
) -> Result<(StatusCode, Json<Prompt>), ApiError> {
    state.store.lock().await.add(prompt.clone()).await?;
    Ok((StatusCode::CREATED, Json(prompt)))
}

async fn update_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<PromptPatch>,
) -> Result<Json<Prompt>, ApiError> {
    let updated = state.store.lock().await.update(&id, patch).await?;
    Ok(Json(updated))
}

async fn delete_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Prompt>, ApiError> {
    let removed = state.store.lock().await.delete(&id).await?;
    Ok(Json(removed))
}

/// Reject requests without the configured bearer token.
pub async fn auth_layer(
    State(api_key): State<Option<String>>,
    req: Request,
    next: Next,
) -> Response {
    if let Some(expected) = api_key.as_deref() {
        let auth_ok = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|t| t == expected);
        if !auth_ok {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response();
        }
    }
    next.run(req).await
}

pub fn is_localhost(bind: &str) -> bool {
    use std::net::IpAddr;

    let host = if let Some(inner) = bind.strip_prefix('[')
        && let Some(bracket_end) = inner.find(']')
    {
        &inner[..bracket_end]
    } else if let Some(colon) = bind.rfind(':') {
        &bind[..colon]
    } else {
        bind
    };

    host == "localhost" || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}
