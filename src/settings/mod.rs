//! Runtime settings: environment override, then stored value, then default.

pub mod env;
pub mod provider;
pub mod provider_impl;
pub mod registry;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

use crate::db::SettingRow;

pub use env::{EnvSource, ProcessEnv};
pub use provider::{ENV_READ_ONLY_MESSAGE, SettingsError, SettingsProvider};
pub use provider_impl::SeaOrmSettingsProvider;
pub use registry::{SECRET_SETTINGS, Setting, SettingsRegistry, display_value, env_key, names};

/// Which tier produced a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Env,
    Stored,
    Default,
}

impl ValueSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Env => "env",
            Self::Stored => "stored",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    pub source: ValueSource,
}

enum ProviderState {
    Unattached,
    Attached(Arc<dyn SettingsProvider>),
}

pub struct Settings {
    registry: Arc<SettingsRegistry>,
    env: Arc<dyn EnvSource>,
    provider: RwLock<ProviderState>,

    /// Effective values captured at attach time. Served when the provider
    /// has nothing better to offer or fails.
    fallback: RwLock<HashMap<String, String>>,
}

impl Settings {
    pub fn new(registry: Arc<SettingsRegistry>, env: Arc<dyn EnvSource>) -> Self {
        Self {
            registry,
            env,
            provider: RwLock::new(ProviderState::Unattached),
            fallback: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &SettingsRegistry {
        &self.registry
    }

    fn attached(&self) -> Option<Arc<dyn SettingsProvider>> {
        match &*self.provider.read().unwrap_or_else(PoisonError::into_inner) {
            ProviderState::Unattached => None,
            ProviderState::Attached(provider) => Some(provider.clone()),
        }
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached().is_some()
    }

    /// Non-empty environment override for `name`, if any.
    #[must_use]
    pub fn env_value(&self, name: &str) -> Option<String> {
        self.env.var(&env_key(name))
    }

    #[must_use]
    pub fn is_env_managed(&self, name: &str) -> bool {
        self.env_value(name).is_some()
    }

    fn fallback_value(&self, name: &str) -> String {
        self.fallback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .or_else(|| self.registry.default_of(name))
            .unwrap_or_default()
    }

    /// Reconciles the registry into `provider` and switches all further
    /// reads and writes over to it.
    pub async fn attach(&self, provider: Arc<dyn SettingsProvider>) -> Result<(), SettingsError> {
        let registered = self.registry.snapshot();
        let env: HashMap<String, String> = registered
            .iter()
            .filter_map(|s| self.env_value(&s.name).map(|v| (s.name.clone(), v)))
            .collect();

        let snapshot = provider.set_all(&registered, &env).await?;

        *self.fallback.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
        *self.provider.write().unwrap_or_else(PoisonError::into_inner) =
            ProviderState::Attached(provider);

        info!(
            settings = registered.len(),
            env_overrides = env.len(),
            "Settings provider attached"
        );
        Ok(())
    }

    pub async fn resolve(&self, name: &str) -> Resolved {
        if let Some(value) = self.env_value(name) {
            return Resolved {
                value,
                source: ValueSource::Env,
            };
        }

        let Some(provider) = self.attached() else {
            return Resolved {
                value: self.registry.default_of(name).unwrap_or_default(),
                source: ValueSource::Default,
            };
        };

        match provider.get(name).await {
            Ok(Some(row)) if !row.value.is_empty() => Resolved {
                value: row.value,
                source: ValueSource::Stored,
            },
            Ok(Some(row)) if !row.default_value.is_empty() => Resolved {
                value: row.default_value,
                source: ValueSource::Default,
            },
            Ok(_) => Resolved {
                value: self.fallback_value(name),
                source: ValueSource::Default,
            },
            Err(e) => {
                warn!(setting = name, error = %e, "Settings provider read failed, using fallback");
                Resolved {
                    value: self.fallback_value(name),
                    source: ValueSource::Default,
                }
            }
        }
    }

    /// Never fails; unknown names resolve to an empty string.
    pub async fn get(&self, name: &str) -> String {
        self.resolve(name).await.value
    }

    /// `true` only for the literal string `"true"`.
    pub async fn get_bool(&self, name: &str) -> bool {
        self.get(name).await == "true"
    }

    pub async fn set(&self, name: &str, value: &str) -> Result<(), SettingsError> {
        if self.is_env_managed(name) {
            return Err(SettingsError::EnvManaged(name.to_string()));
        }
        let provider = self.attached().ok_or(SettingsError::NotAttached)?;
        provider.update(name, value).await
    }

    /// Returns whether a write happened.
    pub async fn set_if_unset(&self, name: &str, value: &str) -> Result<bool, SettingsError> {
        let provider = self.attached().ok_or(SettingsError::NotAttached)?;
        provider.set_if_unset(name, value).await
    }

    pub async fn get_row(&self, name: &str) -> Result<Option<SettingRow>, SettingsError> {
        let provider = self.attached().ok_or(SettingsError::NotAttached)?;
        provider.get(name).await
    }

    pub async fn list_rows(&self) -> Result<Vec<SettingRow>, SettingsError> {
        let provider = self.attached().ok_or(SettingsError::NotAttached)?;
        provider.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;

    fn env(pairs: &[(&str, &str)]) -> Arc<dyn EnvSource> {
        Arc::new(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    async fn attached(env_pairs: &[(&str, &str)]) -> (Settings, Store) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let settings = Settings::new(Arc::new(SettingsRegistry::with_defaults()), env(env_pairs));
        settings
            .attach(Arc::new(SeaOrmSettingsProvider::new(store.clone())))
            .await
            .unwrap();
        (settings, store)
    }

    #[tokio::test]
    async fn unattached_reads_registry_defaults() {
        let settings = Settings::new(Arc::new(SettingsRegistry::with_defaults()), env(&[]));
        assert!(!settings.is_attached());
        assert_eq!(settings.get(names::TOKEN_EXPIRE_TIME).await, "24h");
        assert_eq!(settings.get("unknown").await, "");

        let err = settings.set(names::UI_PL, "x").await.unwrap_err();
        assert!(matches!(err, SettingsError::NotAttached));
    }

    #[tokio::test]
    async fn unattached_env_still_wins() {
        let settings = Settings::new(
            Arc::new(SettingsRegistry::with_defaults()),
            env(&[("LLMOSSIGNUP_ENABLED", "false")]),
        );
        let resolved = settings.resolve(names::SIGNUP_ENABLED).await;
        assert_eq!(resolved.value, "false");
        assert_eq!(resolved.source, ValueSource::Env);
    }

    #[tokio::test]
    async fn get_after_set_returns_value() {
        let (settings, _store) = attached(&[]).await;

        assert_eq!(settings.get(names::SIGNUP_ENABLED).await, "true");
        settings.set(names::SIGNUP_ENABLED, "false").await.unwrap();

        let resolved = settings.resolve(names::SIGNUP_ENABLED).await;
        assert_eq!(resolved.value, "false");
        assert_eq!(resolved.source, ValueSource::Stored);
        assert!(!settings.get_bool(names::SIGNUP_ENABLED).await);
    }

    #[tokio::test]
    async fn env_managed_setting_rejects_writes_and_wins_reads() {
        let (settings, store) = attached(&[("LLMOSUI_PL", "Pinned")]).await;

        for value in ["", "other", "Pinned"] {
            let err = settings.set(names::UI_PL, value).await.unwrap_err();
            assert!(matches!(err, SettingsError::EnvManaged(_)));
            assert_eq!(err.to_string(), ENV_READ_ONLY_MESSAGE);
        }

        // Reconciliation copied the env value into storage.
        assert_eq!(store.get_setting(names::UI_PL).await.unwrap().unwrap().value, "Pinned");

        // A value written behind the resolver's back is still shadowed.
        store.update_setting_value(names::UI_PL, "sneaky").await.unwrap();
        let resolved = settings.resolve(names::UI_PL).await;
        assert_eq!(resolved.value, "Pinned");
        assert_eq!(resolved.source, ValueSource::Env);
    }

    #[tokio::test]
    async fn empty_env_value_is_not_an_override() {
        let (settings, _store) = attached(&[("LLMOSUI_PL", "")]).await;
        settings.set(names::UI_PL, "Mine").await.unwrap();
        assert_eq!(settings.get(names::UI_PL).await, "Mine");
    }

    #[tokio::test]
    async fn set_if_unset_keeps_existing_value() {
        let (settings, _store) = attached(&[]).await;

        assert!(settings.set_if_unset(names::JWT_SECRET, "aaa").await.unwrap());
        assert!(!settings.set_if_unset(names::JWT_SECRET, "bbb").await.unwrap());
        assert_eq!(settings.get(names::JWT_SECRET).await, "aaa");

        let err = settings.set_if_unset("nope", "x").await.unwrap_err();
        assert!(matches!(err, SettingsError::NotFound(_)));
    }

    #[tokio::test]
    async fn set_unknown_name_is_not_found() {
        let (settings, _store) = attached(&[]).await;
        let err = settings.set("nope", "x").await.unwrap_err();
        assert!(matches!(err, SettingsError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_default_falls_through_to_snapshot() {
        let (settings, _store) = attached(&[]).await;
        let resolved = settings.resolve(names::WEBHOOK_URL).await;
        assert_eq!(resolved.value, "");
        assert_eq!(resolved.source, ValueSource::Default);
    }

    #[tokio::test]
    async fn config_overrides_become_stored_defaults() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let registry = SettingsRegistry::with_defaults();
        registry.apply_overrides(&HashMap::from([(
            names::DEFAULT_USER_ROLE.to_string(),
            "user".to_string(),
        )]));
        let settings = Settings::new(Arc::new(registry), env(&[]));
        settings
            .attach(Arc::new(SeaOrmSettingsProvider::new(store.clone())))
            .await
            .unwrap();

        assert_eq!(settings.get(names::DEFAULT_USER_ROLE).await, "user");
        let row = settings.get_row(names::DEFAULT_USER_ROLE).await.unwrap().unwrap();
        assert_eq!(row.default_value, "user");
        assert_eq!(settings.list_rows().await.unwrap().len(), 10);
    }
}
