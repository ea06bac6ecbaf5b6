use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::post;
use axum::Router;
use nyx_analyzer::{ModelManager, QueryOutcome};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

/// Bearer-token-guarded HTTP surface exposing a liveness check and a
/// paginated query endpoint for the browser-side UI bridge.
#[derive(Clone)]
struct RpcState {
    manager: Arc<ModelManager>,
    shared_secret: Arc<String>,
}

pub fn router(manager: Arc<ModelManager>, shared_secret: String) -> Router {
    let state = RpcState {
        manager,
        shared_secret: Arc::new(shared_secret),
    };
    Router::new()
        .route("/heartbeat", post(heartbeat))
        .route("/get_pages", post(get_pages))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn authorize(headers: &HeaderMap, state: &RpcState) -> Result<(), StatusCode> {
    let provided = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match provided {
        Some(token) if token == state.shared_secret.as_str() => Ok(()),
        _ => {
            tracing::warn!("rejected request with missing or invalid bearer token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

async fn heartbeat(
    State(state): State<RpcState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    authorize(&headers, &state).await?;
    Ok(Json(true))
}

#[derive(Debug, Deserialize)]
struct GetPagesRequest {
    query: String,
    #[serde(default = "default_num")]
    num: usize,
}

fn default_num() -> usize {
    10
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GetPagesResponse {
    Pages(Vec<nyx_core::PageView>),
    Status(String),
}

async fn get_pages(
    State(state): State<RpcState>,
    headers: HeaderMap,
    Json(req): Json<GetPagesRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    authorize(&headers, &state).await?;
    let outcome = state.manager.get_pages(&req.query, req.num).await;
    let response = match outcome {
        QueryOutcome::Pages(pages) => GetPagesResponse::Pages(pages),
        QueryOutcome::Status(s) => GetPagesResponse::Status(s.to_string()),
    };
    Ok(Json(response))
}
