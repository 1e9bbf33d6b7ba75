//! Authorization gateway: session authentication, role gate and signup gate.
//!
//! Each stage either passes the request on or short-circuits with an
//! [`ApiError`]; nothing is retried and nothing is skipped silently.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use super::{ApiError, AppState};
use crate::db::User;
use crate::entities::users::Role;
use crate::settings::names;

/// Routes reachable without a session.
pub const PUBLIC_PATHS: &[&str] = &["/api/v1/auths/signin", "/api/v1/auths/signup"];

/// The authenticated subject, attached to the request by [`authenticate`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.0.role == Role::Admin
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
    }
}

#[must_use]
pub fn normalize_path(path: &str) -> String {
    let lower = path.to_ascii_lowercase();
    let trimmed = lower.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

#[must_use]
pub fn is_public_path(path: &str) -> bool {
    let path = normalize_path(path);
    PUBLIC_PATHS.iter().any(|p| *p == path)
}

/// Token from `Authorization: Bearer <token>`.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_public_path(request.uri().path()) {
        debug!(path = %request.uri().path(), "Public route, skipping authentication");
        return Ok(next.run(request).await);
    }

    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("authorization header is required"))?;

    let claims = state
        .tokens
        .verify(token)
        .map_err(|_| ApiError::unauthorized("invalid token"))?;

    let user = state
        .store
        .get_user(claims.sub)
        .await?
        .ok_or_else(|| ApiError::internal(format!("failed to get user {}", claims.sub)))?;

    tracing::Span::current().record("user_id", tracing::field::display(user.id));
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

/// Must run after [`authenticate`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    if !user.is_admin() {
        return Err(ApiError::forbidden("admin role required"));
    }

    Ok(next.run(request).await)
}

pub async fn require_signup_enabled(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.settings.get_bool(names::SIGNUP_ENABLED).await {
        return Err(ApiError::forbidden("Sign up is disabled, please contact the administrator"));
    }
    Ok(next.run(request).await)
}
