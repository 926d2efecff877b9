use std::{fs, path::Path, path::PathBuf};

use serde::Deserialize;

use crate::{DiagflowError, Result, sync::RetryPolicy};

/// Default storage key for the user template list.
pub const USER_TEMPLATES_KEY: &str = "workflow_user_templates";
/// Default storage key for the offline mutation queue.
pub const OFFLINE_QUEUE_KEY: &str = "offline_pending_mutations";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// retry policy shared by backend saves and offline replay
    pub retry: RetryConfig,
    /// import size policy
    pub import: ImportConfig,
    /// store config
    pub store: StoreConfig,
    /// storage keys
    pub keys: KeysConfig,
    /// backend config, absent when running without a remote backend
    pub backend: Option<BackendConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// total attempts including the first one
    pub max_attempts: u32,
    /// delay before the second attempt, in milliseconds
    pub initial_backoff_ms: u64,
    /// backoff growth factor between attempts
    pub multiplier: f64,
    /// upper bound for a single delay, in milliseconds
    pub max_backoff_ms: u64,
    /// add up to 10% random jitter to each delay
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1000,
            multiplier: 2.0,
            max_backoff_ms: 30_000,
            jitter: false,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy::new(config.max_attempts)
            .initial_backoff(std::time::Duration::from_millis(config.initial_backoff_ms))
            .multiplier(config.multiplier)
            .max_backoff(std::time::Duration::from_millis(config.max_backoff_ms))
            .jitter(config.jitter)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImportConfig {
    /// serialized size above which an import warns
    pub max_bytes: usize,
    /// node count at which an import warns
    pub max_nodes: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
            max_nodes: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// store type
    pub store_type: StoreType,
    /// file store config
    pub file: Option<FileStoreConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    #[default]
    Mem,
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileStoreConfig {
    /// directory holding one JSON file per key
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeysConfig {
    pub user_templates: String,
    pub offline_queue: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            user_templates: USER_TEMPLATES_KEY.to_string(),
            offline_queue: OFFLINE_QUEUE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// REST endpoint root, e.g. `https://project.example.co`
    pub base_url: String,
    /// API key sent as `apikey` and bearer token
    #[serde(default)]
    pub api_key: Option<String>,
    /// table holding saved workflows
    #[serde(default = "default_workflows_table")]
    pub workflows_table: String,
    /// request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_workflows_table() -> String {
    "diagnostic_workflows".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref()).map_err(|e| DiagflowError::Config(format!("failed to load config file {:?}: {}", path.as_ref(), e)))?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        config.check()?;
        Ok(config)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(DiagflowError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.retry.multiplier < 1.0 {
            return Err(DiagflowError::Config("retry.multiplier must be >= 1.0".into()));
        }
        if self.store.store_type == StoreType::File && self.store.file.is_none() {
            return Err(DiagflowError::Config("[store.file] is required when store_type is \"file\"".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::{Config, DiagflowError, StoreType};

    #[test]
    fn test_config_deserialize() {
        let toml_str = r#"
        [retry]
        max_attempts = 5
        initial_backoff_ms = 250
        jitter = true

        [store]
        store_type = "file"

        [store.file]
        path = "/var/lib/diagflow"

        [backend]
        base_url = "https://tenant.example.co"
        api_key = "anon"
        "#;
        let config = Config::load_from_str(toml_str).unwrap();
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff_ms, 250);
        assert_eq!(config.retry.multiplier, 2.0);
        assert!(config.retry.jitter);
        assert_eq!(config.store.store_type, StoreType::File);
        assert_eq!(config.store.file.unwrap().path.to_str(), Some("/var/lib/diagflow"));

        let backend = config.backend.unwrap();
        assert_eq!(backend.workflows_table, "diagnostic_workflows");
        assert_eq!(backend.timeout_ms, 10_000);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::load_from_str("").unwrap();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_backoff_ms, 1000);
        assert_eq!(config.import.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.import.max_nodes, 1000);
        assert_eq!(config.store.store_type, StoreType::Mem);
        assert_eq!(config.keys.user_templates, crate::config::USER_TEMPLATES_KEY);
        assert!(config.backend.is_none());
    }

    #[test]
    fn test_config_rejects_file_store_without_path() {
        let err = Config::load_from_str("[store]\nstore_type = \"file\"").unwrap_err();
        assert!(matches!(err, DiagflowError::Config(_)));
    }

    #[test]
    fn test_config_rejects_zero_attempts() {
        let err = Config::load_from_str("[retry]\nmax_attempts = 0").unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }
}
