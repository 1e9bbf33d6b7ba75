//! Domain service for sign-in and sign-up.

use serde::Serialize;
use thiserror::Error;

use crate::auth::token::TokenError;
use crate::db::{User, WriteError};

pub const TOKEN_TYPE: &str = "Bearer";

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(
        "The email or password provided is incorrect. Please check for typos and try logging in again"
    )]
    InvalidCredentials,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<WriteError> for AuthError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::Conflict(msg) => Self::Conflict(msg),
            WriteError::Database(e) => Self::Internal(e.into()),
        }
    }
}

/// A freshly issued token together with the profile it belongs to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub token_type: &'static str,
    #[serde(flatten)]
    pub user: User,
}

impl Session {
    #[must_use]
    pub const fn new(token: String, user: User) -> Self {
        Self {
            token,
            token_type: TOKEN_TYPE,
            user,
        }
    }
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown email and for a
    /// wrong password alike.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Creates the account and signs it in. The first account ever created
    /// becomes an admin.
    async fn sign_up(&self, name: &str, email: &str, password: &str)
    -> Result<Session, AuthError>;
}
