use std::collections::HashMap;

/// Source of environment overrides. Empty values count as unset.
pub trait EnvSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_source_treats_empty_as_unset() {
        let env = HashMap::from([
            ("LLMOSA".to_string(), "1".to_string()),
            ("LLMOSB".to_string(), String::new()),
        ]);
        assert_eq!(env.var("LLMOSA").as_deref(), Some("1"));
        assert_eq!(env.var("LLMOSB"), None);
        assert_eq!(env.var("LLMOSC"), None);
    }
}
