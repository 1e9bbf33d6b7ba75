//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::service::{AuthError, AuthService, Session};
use crate::auth::token::TokenService;
use crate::config::SecurityConfig;
use crate::db::{NewUser, Store};
use crate::entities::users::Role;
use crate::settings::{Settings, names};

/// Hashed once, then verified against when the email is unknown.
const DUMMY_PASSWORD: &str = "llmos-dashboard-unknown-account";

pub struct SeaOrmAuthService {
    store: Store,
    settings: Arc<Settings>,
    tokens: Arc<TokenService>,
    security: SecurityConfig,

    /// Digest with the configured Argon2 cost, for unknown-email sign-ins.
    dummy_digest: OnceCell<String>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        settings: Arc<Settings>,
        tokens: Arc<TokenService>,
        security: SecurityConfig,
    ) -> Self {
        Self {
            store,
            settings,
            tokens,
            security,
            dummy_digest: OnceCell::new(),
        }
    }

    async fn dummy_digest(&self) -> Result<String, AuthError> {
        let digest = self
            .dummy_digest
            .get_or_try_init(|| {
                hash_password_blocking(DUMMY_PASSWORD.to_string(), self.security.clone())
            })
            .await?;
        Ok(digest.clone())
    }

    async fn default_role(&self) -> Role {
        let raw = self.settings.get(names::DEFAULT_USER_ROLE).await;
        raw.parse().unwrap_or_else(|_| {
            warn!(value = %raw, "Invalid default-user-role setting, using pending");
            Role::Pending
        })
    }
}

fn validate_sign_up(name: &str, email: &str, password: &str) -> Result<(), AuthError> {
    if name.trim().is_empty() {
        return Err(AuthError::Validation("name is required".to_string()));
    }
    if email.trim().is_empty() || !email.contains('@') {
        return Err(AuthError::Validation("a valid email is required".to_string()));
    }
    if password.is_empty() {
        return Err(AuthError::Validation("password is required".to_string()));
    }
    Ok(())
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let Some((user, digest)) = self.store.get_user_credentials(email).await? else {
            // Pay the same hash cost as a wrong password.
            let digest = self.dummy_digest().await?;
            verify_password_blocking(password.to_string(), digest).await?;
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password_blocking(password.to_string(), digest).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id).await?;
        Ok(Session::new(token, user))
    }

    async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        validate_sign_up(name, email, password)?;

        let digest = hash_password_blocking(password.to_string(), self.security.clone()).await?;
        let user = self
            .store
            .create_user(
                NewUser {
                    name: name.trim(),
                    email: email.trim(),
                    password_hash: &digest,
                },
                self.default_role().await,
            )
            .await?;

        info!(user_id = %user.id, role = %user.role, "User signed up");

        let token = self.tokens.issue(user.id).await?;
        Ok(Session::new(token, user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{EnvSource, SeaOrmSettingsProvider, SettingsRegistry};
    use std::collections::HashMap;

    async fn service() -> SeaOrmAuthService {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let settings = Arc::new(Settings::new(
            Arc::new(SettingsRegistry::with_defaults()),
            Arc::new(HashMap::<String, String>::new()) as Arc<dyn EnvSource>,
        ));
        settings
            .attach(Arc::new(SeaOrmSettingsProvider::new(store.clone())))
            .await
            .unwrap();
        let tokens = Arc::new(TokenService::new("test-secret", settings.clone()));
        let security = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        };
        SeaOrmAuthService::new(store, settings, tokens, security)
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let svc = service().await;

        let admin = svc.sign_up("alice", "alice@example.com", "pw").await.unwrap();
        assert_eq!(admin.user.role, Role::Admin);
        assert_eq!(admin.token_type, "Bearer");

        let pending = svc.sign_up("bob", "bob@example.com", "pw").await.unwrap();
        assert_eq!(pending.user.role, Role::Pending);

        let session = svc.sign_in("alice@example.com", "pw").await.unwrap();
        assert_eq!(session.user.id, admin.user.id);
        assert_eq!(svc.tokens.verify(&session.token).unwrap().sub, admin.user.id);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let svc = service().await;
        svc.sign_up("alice", "alice@example.com", "pw").await.unwrap();

        let wrong = svc.sign_in("alice@example.com", "nope").await.unwrap_err();
        let unknown = svc.sign_in("ghost@example.com", "pw").await.unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn unknown_email_still_runs_password_verification() {
        let svc = service().await;
        assert!(!svc.dummy_digest.initialized());

        let err = svc.sign_in("ghost@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let digest = svc.dummy_digest.get().unwrap();
        assert!(digest.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));

        // Reused on later misses.
        svc.sign_in("nobody@example.com", "pw").await.unwrap_err();
        assert_eq!(svc.dummy_digest.get(), Some(digest));
    }

    #[tokio::test]
    async fn default_role_setting_applies_after_first_user() {
        let svc = service().await;
        svc.settings.set(names::DEFAULT_USER_ROLE, "user").await.unwrap();

        let first = svc.sign_up("a", "a@example.com", "pw").await.unwrap();
        let second = svc.sign_up("b", "b@example.com", "pw").await.unwrap();
        assert_eq!(first.user.role, Role::Admin);
        assert_eq!(second.user.role, Role::User);
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let svc = service().await;
        svc.sign_up("a", "a@example.com", "pw").await.unwrap();
        let err = svc.sign_up("b", "a@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn sign_up_validation() {
        let svc = service().await;
        assert!(matches!(
            svc.sign_up(" ", "a@example.com", "pw").await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            svc.sign_up("a", "not-an-email", "pw").await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            svc.sign_up("a", "a@example.com", "").await,
            Err(AuthError::Validation(_))
        ));
    }
}
