//! Stateless HS256 session tokens.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::parser::duration::parse_duration;
use crate::settings::{Settings, SettingsError, names};

pub const ISSUER: &str = "llmos-issuer";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token expiry setting: {0}")]
    Config(String),

    #[error("Invalid token")]
    Invalid,

    #[error("Token expired")]
    Expired,

    #[error("Failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Parses `token-expire-time`. Zero and negative durations are rejected.
pub fn parse_expiry(raw: &str) -> Result<TimeDelta, TokenError> {
    match parse_duration(raw) {
        Some(ttl) if ttl > TimeDelta::zero() => Ok(ttl),
        Some(_) => Err(TokenError::Config(format!("{raw:?} is not a positive duration"))),
        None => Err(TokenError::Config(format!("{raw:?} is not a duration"))),
    }
}

/// Random 64 character hex string.
#[must_use]
pub fn generate_secret() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// Persists a random secret on a fresh installation, then returns the
/// effective one.
pub async fn bootstrap_signing_key(settings: &Settings) -> Result<String, SettingsError> {
    if settings
        .set_if_unset(names::JWT_SECRET, &generate_secret())
        .await?
    {
        debug!("Generated a new token signing key");
    }
    Ok(settings.get(names::JWT_SECRET).await)
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    settings: Arc<Settings>,
}

impl TokenService {
    pub fn new(secret: &str, settings: Arc<Settings>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            settings,
        }
    }

    pub async fn issue(&self, subject: Uuid) -> Result<String, TokenError> {
        let ttl = parse_expiry(&self.settings.get(names::TOKEN_EXPIRE_TIME).await)?;
        self.sign(subject, Utc::now(), ttl)
    }

    pub(crate) fn sign(
        &self,
        subject: Uuid,
        issued_at: DateTime<Utc>,
        ttl: TimeDelta,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject,
            iss: ISSUER.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{EnvSource, SettingsRegistry};
    use std::collections::HashMap;

    fn settings_with(env: &[(&str, &str)]) -> Arc<Settings> {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Arc::new(Settings::new(
            Arc::new(SettingsRegistry::with_defaults()),
            Arc::new(env) as Arc<dyn EnvSource>,
        ))
    }

    #[tokio::test]
    async fn issue_then_verify_round_trips_subject() {
        let service = TokenService::new("secret", settings_with(&[]));
        let subject = Uuid::new_v4();

        let token = service.issue(subject).await.unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.sub, subject);
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[tokio::test]
    async fn expiry_comes_from_settings() {
        let service = TokenService::new(
            "secret",
            settings_with(&[("LLMOSTOKEN_EXPIRE_TIME", "1h30m")]),
        );
        let claims = service
            .verify(&service.issue(Uuid::new_v4()).await.unwrap())
            .unwrap();
        assert_eq!(claims.exp - claims.iat, 90 * 60);
    }

    #[tokio::test]
    async fn unparsable_expiry_is_config_error() {
        let service = TokenService::new(
            "secret",
            settings_with(&[("LLMOSTOKEN_EXPIRE_TIME", "one day")]),
        );
        let err = service.issue(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, TokenError::Config(_)));
    }

    #[test]
    fn expired_token_is_expired_error() {
        let service = TokenService::new("secret", settings_with(&[]));
        let token = service
            .sign(
                Uuid::new_v4(),
                Utc::now() - TimeDelta::hours(2),
                TimeDelta::hours(1),
            )
            .unwrap();
        assert!(matches!(service.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn garbage_and_foreign_tokens_are_invalid() {
        let service = TokenService::new("secret", settings_with(&[]));
        let other = TokenService::new("other-secret", settings_with(&[]));

        assert!(matches!(service.verify(""), Err(TokenError::Invalid)));
        assert!(matches!(service.verify("a.b.c"), Err(TokenError::Invalid)));

        let foreign = other
            .sign(Uuid::new_v4(), Utc::now(), TimeDelta::hours(1))
            .unwrap();
        assert!(matches!(service.verify(&foreign), Err(TokenError::Invalid)));
    }

    #[test]
    fn wrong_issuer_is_invalid() {
        let service = TokenService::new("secret", settings_with(&[]));
        let claims = Claims {
            sub: Uuid::new_v4(),
            iss: "someone-else".to_string(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + TimeDelta::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(matches!(service.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn parse_expiry_rejects_non_positive() {
        assert_eq!(parse_expiry("24h").unwrap(), TimeDelta::hours(24));
        assert!(matches!(parse_expiry("0"), Err(TokenError::Config(_))));
        assert!(matches!(parse_expiry("-1h"), Err(TokenError::Config(_))));
        assert!(matches!(parse_expiry("soon"), Err(TokenError::Config(_))));
    }

    #[test]
    fn generated_secrets_are_hex_and_unique() {
        let a = generate_secret();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, generate_secret());
    }
}
