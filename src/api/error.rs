use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ErrorBody;
use crate::auth::{AuthError, TokenError};
use crate::db::WriteError;
use crate::proxy::ProxyError;
use crate::settings::SettingsError;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),

    Forbidden(String),

    Validation(String),

    NotFound(String),

    Conflict(String),

    /// Unusable configuration value or a write against an env-pinned setting
    Config(String),

    BadGateway(String),

    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::Config(msg) => write!(f, "Config error: {msg}"),
            Self::BadGateway(msg) => write!(f, "Bad gateway: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Config(msg) => {
                tracing::error!("Config error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            Self::BadGateway(msg) => {
                tracing::warn!("Upstream error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            Self::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorBody::new(error_message))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized(err.to_string()),
            AuthError::Validation(msg) => Self::Validation(msg),
            AuthError::Conflict(msg) => Self::Conflict(msg),
            AuthError::Token(e) => e.into(),
            AuthError::Internal(e) => e.into(),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Config(_) => Self::Config(err.to_string()),
            TokenError::Invalid | TokenError::Expired => Self::Unauthorized(err.to_string()),
            TokenError::Signing(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<SettingsError> for ApiError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::EnvManaged(_) => Self::Config(err.to_string()),
            SettingsError::NotFound(_) => Self::NotFound(err.to_string()),
            SettingsError::NotAttached | SettingsError::Store(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<WriteError> for ApiError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::Conflict(msg) => Self::Conflict(msg),
            WriteError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::Config { .. } => Self::Config(err.to_string()),
            ProxyError::Request(msg) => Self::Validation(msg),
            ProxyError::Upstream(_) => Self::BadGateway(err.to_string()),
        }
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::NotFound(format!("{resource} {id} not found"))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn status_codes_and_body_shape() {
        let cases = [
            (ApiError::unauthorized("no"), StatusCode::UNAUTHORIZED),
            (ApiError::forbidden("no"), StatusCode::FORBIDDEN),
            (ApiError::validation("bad"), StatusCode::BAD_REQUEST),
            (ApiError::not_found("User", 1), StatusCode::NOT_FOUND),
            (ApiError::Conflict("dup".into()), StatusCode::CONFLICT),
            (ApiError::Config("cfg".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::BadGateway("down".into()), StatusCode::BAD_GATEWAY),
        ];
        for (err, expected) in cases {
            let (status, body) = render(err).await;
            assert_eq!(status, expected);
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn internal_details_are_hidden() {
        let (status, body) = render(ApiError::internal("sqlite exploded")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An internal error occurred");
    }

    #[tokio::test]
    async fn env_managed_write_keeps_message() {
        let err: ApiError = SettingsError::EnvManaged("ui-pl".into()).into();
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "read-only: sourced from environment");
    }

    #[test]
    fn token_errors_map_to_unauthorized() {
        assert!(matches!(ApiError::from(TokenError::Expired), ApiError::Unauthorized(_)));
        assert!(matches!(ApiError::from(TokenError::Invalid), ApiError::Unauthorized(_)));
        assert!(matches!(
            ApiError::from(TokenError::Config("x".into())),
            ApiError::Config(_)
        ));
    }
}
