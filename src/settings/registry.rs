use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "LLMOS";

pub mod names {
    pub const FIRST_LOGIN: &str = "first-login";
    pub const UI_PL: &str = "ui-pl";
    pub const SIGNUP_ENABLED: &str = "signup-enabled";
    pub const DEFAULT_USER_ROLE: &str = "default-user-role";
    pub const WEBHOOK_URL: &str = "webhook-url";
    pub const JWT_SECRET: &str = "jwt-secret";
    pub const TOKEN_EXPIRE_TIME: &str = "token-expire-time";
    pub const ALLOW_CHAT_DELETION: &str = "allow-chat-deletion";
    pub const MODEL_WHITELIST: &str = "model-whitelist";
    pub const LOCAL_LLM_SERVER_URL: &str = "local-llm-server-url";
}

/// Values that are never shown in full outside the store.
pub const SECRET_SETTINGS: &[&str] = &[names::JWT_SECRET];

const SECRET_MASK: &str = "********";

/// Masked form of `value` for display; non-secret settings pass through.
#[must_use]
pub fn display_value(name: &str, value: &str) -> String {
    if SECRET_SETTINGS.contains(&name) && !value.is_empty() {
        SECRET_MASK.to_string()
    } else {
        value.to_string()
    }
}

const COMPILED_DEFAULTS: &[(&str, &str)] = &[
    (names::FIRST_LOGIN, "true"),
    (names::UI_PL, "LLMOS Dashboard"),
    (names::SIGNUP_ENABLED, "true"),
    (names::DEFAULT_USER_ROLE, "pending"),
    (names::WEBHOOK_URL, ""),
    (names::JWT_SECRET, "llmos-dashboard-secret"),
    (names::TOKEN_EXPIRE_TIME, "24h"),
    (names::ALLOW_CHAT_DELETION, "true"),
    (names::MODEL_WHITELIST, ""),
    (names::LOCAL_LLM_SERVER_URL, "http://localhost:11434"),
];

/// `signup-enabled` -> `LLMOSSIGNUP_ENABLED`
#[must_use]
pub fn env_key(name: &str) -> String {
    format!("{ENV_PREFIX}{}", name.replace('-', "_").to_uppercase())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub name: String,
    pub default: String,
}

/// Process-wide table of known setting names and their compiled defaults.
#[derive(Debug, Default)]
pub struct SettingsRegistry {
    entries: RwLock<BTreeMap<String, String>>,
}

impl SettingsRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with every setting the dashboard knows about.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for (name, default) in COMPILED_DEFAULTS {
            registry.register(name, default);
        }
        registry
    }

    pub fn register(&self, name: &str, default: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), default.to_string());
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    #[must_use]
    pub fn default_of(&self, name: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Sorted by name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Setting> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, default)| Setting {
                name: name.clone(),
                default: default.clone(),
            })
            .collect()
    }

    /// Replaces defaults of already registered names. Returns the names that
    /// were not registered and therefore ignored.
    pub fn apply_overrides(&self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut unknown = Vec::new();
        for (name, default) in overrides {
            match entries.get_mut(name) {
                Some(slot) => slot.clone_from(default),
                None => unknown.push(name.clone()),
            }
        }
        unknown.sort();
        unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_values_are_masked() {
        assert_eq!(display_value(names::JWT_SECRET, "abc"), "********");
        assert_eq!(display_value(names::JWT_SECRET, ""), "");
        assert_eq!(display_value(names::UI_PL, "LLMOS"), "LLMOS");
    }

    #[test]
    fn test_env_key() {
        assert_eq!(env_key("signup-enabled"), "LLMOSSIGNUP_ENABLED");
        assert_eq!(env_key("ui-pl"), "LLMOSUI_PL");
        assert_eq!(env_key("local-llm-server-url"), "LLMOSLOCAL_LLM_SERVER_URL");
    }

    #[test]
    fn test_with_defaults() {
        let registry = SettingsRegistry::with_defaults();
        assert_eq!(registry.snapshot().len(), COMPILED_DEFAULTS.len());
        assert_eq!(
            registry.default_of(names::DEFAULT_USER_ROLE).as_deref(),
            Some("pending")
        );
        assert_eq!(registry.default_of(names::WEBHOOK_URL).as_deref(), Some(""));
        assert!(registry.default_of("nope").is_none());
    }

    #[test]
    fn test_apply_overrides_ignores_unknown() {
        let registry = SettingsRegistry::with_defaults();
        let overrides = HashMap::from([
            (names::SIGNUP_ENABLED.to_string(), "false".to_string()),
            ("does-not-exist".to_string(), "x".to_string()),
        ]);

        let unknown = registry.apply_overrides(&overrides);
        assert_eq!(unknown, vec!["does-not-exist".to_string()]);
        assert_eq!(
            registry.default_of(names::SIGNUP_ENABLED).as_deref(),
            Some("false")
        );
        assert!(!registry.contains("does-not-exist"));
    }
}
