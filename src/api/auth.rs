use axum::{Json, extract::State};
use serde::Deserialize;
use std::sync::Arc;

use super::gateway::CurrentUser;
use super::validation::ApiJson;
use super::{ApiError, AppState};
use crate::auth::Session;
use crate::db::User;

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// POST /api/v1/auths/signin
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<SignInRequest>,
) -> Result<Json<Session>, ApiError> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("email and password are required"));
    }

    let session = state.auth.sign_in(&payload.email, &payload.password).await?;
    Ok(Json(session))
}

/// POST /api/v1/auths/signup
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<SignUpRequest>,
) -> Result<Json<Session>, ApiError> {
    let session = state
        .auth
        .sign_up(&payload.name, &payload.email, &payload.password)
        .await?;
    Ok(Json(session))
}

/// GET /api/v1/auths/
pub async fn session_user(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}
