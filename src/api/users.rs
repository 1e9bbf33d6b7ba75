use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::gateway::CurrentUser;
use super::validation::{ApiJson, parse_id, parse_role};
use super::{ApiError, AppState, StatusResponse};
use crate::auth::password::hash_password_blocking;
use crate::db::{DEFAULT_PROFILE_IMAGE, ProfileUpdate, User};
use crate::entities::users::Role;

#[derive(Deserialize)]
pub struct UpdateRoleRequest {
    pub id: String,
    pub role: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: String,
    pub name: String,
    pub password: Option<String>,
    #[serde(default, alias = "profile_image_url")]
    pub profile_image_url: String,
}

/// GET /api/v1/users/
pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.store.list_users().await?))
}

/// POST /api/v1/users/update/role
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    CurrentUser(admin): CurrentUser,
    ApiJson(payload): ApiJson<UpdateRoleRequest>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&payload.id)?;
    let role = parse_role(&payload.role)?;

    let user = state
        .store
        .update_user_role(id, role)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    info!(admin_id = %admin.id, user_id = %user.id, role = %role, "User role changed");
    Ok(Json(user))
}

/// POST /api/v1/users/{id}/update
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&id)?;
    if caller.id != id && caller.role != Role::Admin {
        return Err(ApiError::forbidden("cannot update another user"));
    }
    if payload.name.trim().is_empty() || payload.email.trim().is_empty() {
        return Err(ApiError::validation("name and email are required"));
    }

    let password_hash = match payload.password.filter(|p| !p.is_empty()) {
        Some(password) => {
            Some(hash_password_blocking(password, state.config.security.clone()).await?)
        }
        None => None,
    };

    let profile_image_url = if payload.profile_image_url.is_empty() {
        DEFAULT_PROFILE_IMAGE.to_string()
    } else {
        payload.profile_image_url
    };

    let user = state
        .store
        .update_user_profile(
            id,
            ProfileUpdate {
                name: payload.name.trim().to_string(),
                email: payload.email.trim().to_string(),
                password_hash,
                profile_image_url,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    Ok(Json(user))
}

/// DELETE /api/v1/users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = parse_id(&id)?;
    if admin.id == id {
        return Err(ApiError::forbidden("cannot delete your own account"));
    }

    if !state.store.delete_user(id).await? {
        return Err(ApiError::not_found("User", id));
    }

    info!(admin_id = %admin.id, user_id = %id, "User deleted");
    Ok(Json(StatusResponse::ok()))
}
