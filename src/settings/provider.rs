//! Persistent backing for runtime settings.

use std::collections::HashMap;
use thiserror::Error;

use crate::db::SettingRow;
use crate::settings::registry::Setting;

/// Message returned for writes to a setting pinned by the environment.
pub const ENV_READ_ONLY_MESSAGE: &str = "read-only: sourced from environment";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("read-only: sourced from environment")]
    EnvManaged(String),

    #[error("Setting not found: {0}")]
    NotFound(String),

    #[error("No settings provider attached")]
    NotAttached,

    #[error("Settings store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Storage operations the resolver needs once bootstrap is over.
#[async_trait::async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<SettingRow>, SettingsError>;

    async fn list(&self) -> Result<Vec<SettingRow>, SettingsError>;

    /// Update-by-name.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NotFound`] when no row has that name.
    async fn update(&self, name: &str, value: &str) -> Result<(), SettingsError>;

    /// Writes `value` only if the stored value is empty. Returns whether it wrote.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NotFound`] when no row has that name.
    async fn set_if_unset(&self, name: &str, value: &str) -> Result<bool, SettingsError>;

    /// Reconciles every registered setting into storage. `env` holds the
    /// non-empty environment overrides keyed by setting name.
    ///
    /// Returns the fallback snapshot: the effective value of each registered
    /// setting right after reconciliation.
    async fn set_all(
        &self,
        registered: &[Setting],
        env: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, SettingsError>;
}
