//! `SeaORM` implementation of the `SettingsProvider` trait.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::db::{SettingRow, Store};
use crate::settings::provider::{SettingsError, SettingsProvider};
use crate::settings::registry::Setting;

pub struct SeaOrmSettingsProvider {
    store: Store,
}

impl SeaOrmSettingsProvider {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SettingsProvider for SeaOrmSettingsProvider {
    async fn get(&self, name: &str) -> Result<Option<SettingRow>, SettingsError> {
        Ok(self.store.get_setting(name).await?)
    }

    async fn list(&self) -> Result<Vec<SettingRow>, SettingsError> {
        Ok(self.store.list_settings().await?)
    }

    async fn update(&self, name: &str, value: &str) -> Result<(), SettingsError> {
        if self.store.update_setting_value(name, value).await? {
            Ok(())
        } else {
            Err(SettingsError::NotFound(name.to_string()))
        }
    }

    async fn set_if_unset(&self, name: &str, value: &str) -> Result<bool, SettingsError> {
        let row = self
            .store
            .get_setting(name)
            .await?
            .ok_or_else(|| SettingsError::NotFound(name.to_string()))?;

        if !row.value.is_empty() {
            return Ok(false);
        }

        self.store.update_setting_value(name, value).await?;
        Ok(true)
    }

    async fn set_all(
        &self,
        registered: &[Setting],
        env: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, SettingsError> {
        let mut snapshot = HashMap::with_capacity(registered.len());

        for setting in registered {
            let env_value = env.get(&setting.name);

            let Some(mut row) = self.store.get_setting(&setting.name).await? else {
                let initial = env_value.map_or("", String::as_str);
                self.store
                    .insert_setting(&setting.name, &setting.default, initial)
                    .await?;
                debug!(setting = %setting.name, "Created setting row");

                snapshot.insert(
                    setting.name.clone(),
                    env_value.unwrap_or(&setting.default).clone(),
                );
                continue;
            };

            let mut changed = false;
            if row.default_value != setting.default {
                info!(setting = %setting.name, "Compiled default changed, updating stored default");
                row.default_value.clone_from(&setting.default);
                changed = true;
            }
            if let Some(env_value) = env_value
                && row.value != *env_value
            {
                debug!(setting = %setting.name, "Environment value differs from stored value");
                row.value.clone_from(env_value);
                changed = true;
            }

            let effective = if row.value.is_empty() {
                row.default_value.clone()
            } else {
                row.value.clone()
            };

            if changed {
                self.store.save_setting(row).await?;
            }

            snapshot.insert(setting.name.clone(), effective);
        }

        Ok(snapshot)
    }
}
