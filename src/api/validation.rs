use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::ApiError;
use crate::auth::token::parse_expiry;
use crate::entities::users::Role;
use crate::proxy::parse_upstream;
use crate::settings::names;

/// `Json` whose rejections come back as `{"error": ...}` with status 400.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(&rejection)),
        }
    }
}

fn json_rejection(rejection: &JsonRejection) -> ApiError {
    ApiError::validation(rejection.body_text())
}

pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::validation(format!("Invalid id: {raw}")))
}

pub fn parse_role(raw: &str) -> Result<Role, ApiError> {
    raw.parse().map_err(ApiError::Validation)
}

pub fn validate_upstream_url(value: &str) -> Result<(), ApiError> {
    parse_upstream(value)
        .map(|_| ())
        .map_err(|e| ApiError::validation(e.to_string()))
}

pub fn validate_webhook_url(value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Ok(());
    }
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| ApiError::validation(format!("Invalid webhook URL {value:?}: {e}")))
}

/// Checks a value before it is written through the settings resolver.
pub fn validate_setting_value(name: &str, value: &str) -> Result<(), ApiError> {
    match name {
        names::TOKEN_EXPIRE_TIME => parse_expiry(value)
            .map(|_| ())
            .map_err(|e| ApiError::validation(e.to_string())),
        names::WEBHOOK_URL => validate_webhook_url(value),
        names::DEFAULT_USER_ROLE => parse_role(value).map(|_| ()),
        names::LOCAL_LLM_SERVER_URL => validate_upstream_url(value),
        names::SIGNUP_ENABLED | names::ALLOW_CHAT_DELETION | names::FIRST_LOGIN => {
            if matches!(value, "true" | "false") {
                Ok(())
            } else {
                Err(ApiError::validation(format!(
                    "{name} must be \"true\" or \"false\""
                )))
            }
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_expiry_must_be_positive_duration() {
        assert!(validate_setting_value(names::TOKEN_EXPIRE_TIME, "12h").is_ok());
        assert!(validate_setting_value(names::TOKEN_EXPIRE_TIME, "1h30m").is_ok());
        assert!(validate_setting_value(names::TOKEN_EXPIRE_TIME, "forever").is_err());
        assert!(validate_setting_value(names::TOKEN_EXPIRE_TIME, "0").is_err());
    }

    #[test]
    fn test_webhook_url_empty_or_absolute() {
        assert!(validate_setting_value(names::WEBHOOK_URL, "").is_ok());
        assert!(validate_setting_value(names::WEBHOOK_URL, "https://hooks.example.com/x").is_ok());
        assert!(validate_setting_value(names::WEBHOOK_URL, "/relative/path").is_err());
    }

    #[test]
    fn test_roles_and_booleans() {
        assert!(validate_setting_value(names::DEFAULT_USER_ROLE, "user").is_ok());
        assert!(validate_setting_value(names::DEFAULT_USER_ROLE, "root").is_err());
        assert!(validate_setting_value(names::SIGNUP_ENABLED, "false").is_ok());
        assert!(validate_setting_value(names::SIGNUP_ENABLED, "no").is_err());
        assert!(validate_setting_value(names::UI_PL, "anything goes").is_ok());
    }

    #[test]
    fn test_upstream_url() {
        assert!(validate_setting_value(names::LOCAL_LLM_SERVER_URL, "http://10.0.0.2:11434").is_ok());
        assert!(validate_setting_value(names::LOCAL_LLM_SERVER_URL, "localhost:11434").is_err());
    }

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        assert!(matches!(parse_id("42"), Err(ApiError::Validation(_))));
    }
}
