use axum::{
    Json,
    body::Body,
    extract::{Path, Request, State},
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::gateway::CurrentUser;
use super::validation::{ApiJson, validate_upstream_url};
use super::{ApiError, AppState, StatusResponse};
use crate::settings::names;

#[derive(Deserialize)]
pub struct UpdateUrlRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct UrlResponse {
    pub url: String,
}

/// GET /localllm/url
pub async fn get_url(State(state): State<Arc<AppState>>) -> Json<UrlResponse> {
    Json(UrlResponse {
        url: state.settings.get(names::LOCAL_LLM_SERVER_URL).await,
    })
}

/// POST /localllm/url/update
pub async fn update_url(
    State(state): State<Arc<AppState>>,
    CurrentUser(admin): CurrentUser,
    ApiJson(payload): ApiJson<UpdateUrlRequest>,
) -> Result<Json<UrlResponse>, ApiError> {
    let url = payload.url.trim().to_string();
    validate_upstream_url(&url)?;

    state
        .settings
        .set(names::LOCAL_LLM_SERVER_URL, &url)
        .await?;

    info!(admin_id = %admin.id, upstream = %url, "Inference server URL updated");
    Ok(Json(UrlResponse { url }))
}

/// GET /localllm/cancel/{id}
///
/// Streaming requests end when the client disconnects, so there is nothing
/// to cancel server side.
pub async fn cancel(Path(_id): Path<String>) -> Json<StatusResponse> {
    Json(StatusResponse::ok())
}

/// Everything under `/localllm/ollama` and `/ollama`.
pub async fn forward(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
) -> Result<Response<Body>, ApiError> {
    Ok(state.proxy.forward(req).await?)
}
