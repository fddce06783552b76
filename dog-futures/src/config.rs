//! # Configuration
//!
//! Same shape as the DogRS app config: a plain string key/value store that
//! applications fill however they like, with an environment loader.
//!
//! ```rust
//! use dog_futures::config::{FlowConfig, ThreadPoolConfig};
//!
//! let mut config = FlowConfig::new();
//! config.set("thread_pool.max_workers", "8");
//!
//! let pool = ThreadPoolConfig::from_config(&config.snapshot());
//! assert_eq!(pool.max_workers, 8);
//! ```
//!
//! Environment overrides use a prefix and `__` as the separator:
//!
//! ```bash
//! export DOG_FLOW__THREAD_POOL__MAX_WORKERS=16
//! ```

use std::collections::HashMap;
use std::time::Duration;

use crate::utils::cpu_count;

/// Prefix read by `FlowConfig::from_env`.
pub const ENV_PREFIX: &str = "DOG_FLOW__";

#[derive(Debug, Default)]
pub struct FlowConfig {
    values: HashMap<String, String>,
}

impl FlowConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Config store populated from `DOG_FLOW__*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::new();
        config.load_env(ENV_PREFIX);
        config
    }

    /// Load every `PREFIX` variable, `PREFIX_A__B=v` becoming `a.b = v`.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(std::env::vars(), prefix);
    }

    fn load_vars(&mut self, vars: impl IntoIterator<Item = (String, String)>, prefix: &str) {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
            }
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> FlowConfigSnapshot {
        FlowConfigSnapshot {
            map: self.values.clone(),
        }
    }
}

/// Read-only copy of a `FlowConfig` with typed getters.
#[derive(Debug, Clone, Default)]
pub struct FlowConfigSnapshot {
    map: HashMap<String, String>,
}

impl FlowConfigSnapshot {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.parse::<bool>().ok())
    }

    /// Parse a millisecond count.
    pub fn get_duration_ms(&self, key: &str) -> Option<Duration> {
        self.get(key)
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
    }
}

/// Configuration for `ThreadPoolExecutor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadPoolConfig {
    /// Maximum number of concurrently running tasks
    pub max_workers: usize,
    /// Name given to worker threads
    pub thread_name: String,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            // Workflow tasks mostly block on solvers or on other futures.
            max_workers: cpu_count() * 5,
            thread_name: "dog-flow-worker".to_string(),
        }
    }
}

impl ThreadPoolConfig {
    /// Read `thread_pool.max_workers` / `thread_pool.thread_name`, falling
    /// back to defaults.
    pub fn from_config(config: &FlowConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            max_workers: config
                .get_usize("thread_pool.max_workers")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_workers),
            thread_name: config
                .get_string("thread_pool.thread_name")
                .unwrap_or(defaults.thread_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get() {
        let mut config = FlowConfig::new();
        config.set("a.b", "1");
        assert_eq!(config.get("a.b"), Some("1"));
        assert!(config.has("a.b"));
        assert!(!config.has("a.c"));
    }

    #[test]
    fn test_env_normalization() {
        let mut config = FlowConfig::new();
        config.load_vars(
            vec![
                ("DOG_FLOW__THREAD_POOL__MAX_WORKERS".to_string(), "3".to_string()),
                ("UNRELATED".to_string(), "x".to_string()),
            ],
            ENV_PREFIX,
        );
        assert_eq!(config.get("thread_pool.max_workers"), Some("3"));
        assert!(!config.has("unrelated"));
    }

    #[test]
    fn test_thread_pool_config_fallbacks() {
        let mut config = FlowConfig::new();
        config.set("thread_pool.max_workers", "0");
        let pool = ThreadPoolConfig::from_config(&config.snapshot());
        assert_eq!(pool, ThreadPoolConfig::default());

        config.set("thread_pool.max_workers", "6");
        config.set("thread_pool.thread_name", "solver");
        let pool = ThreadPoolConfig::from_config(&config.snapshot());
        assert_eq!(pool.max_workers, 6);
        assert_eq!(pool.thread_name, "solver");
    }

    #[test]
    fn test_snapshot_typed_getters() {
        let mut config = FlowConfig::new();
        config.set("flag", "true");
        config.set("wait", "250");
        let snapshot = config.snapshot();
        assert_eq!(snapshot.get_bool("flag"), Some(true));
        assert_eq!(snapshot.get_duration_ms("wait"), Some(Duration::from_millis(250)));
        assert_eq!(snapshot.get_usize("flag"), None);
    }
}
