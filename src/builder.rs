use std::sync::Arc;

use tracing::debug;

use crate::{
    Config, DiagflowError, Result, StoreType, Studio,
    store::{FileStore, KvStore, MemStore, Store},
    sync::{MemBackend, RestBackend, RetryPolicy, WorkflowBackend},
};

/// Builds a [`Studio`]. Anything not set explicitly is derived from the config.
#[derive(Default)]
pub struct StudioBuilder {
    config: Option<Config>,
    kv: Option<Arc<dyn KvStore>>,
    backend: Option<Arc<dyn WorkflowBackend>>,
    retry: Option<RetryPolicy>,
}

impl StudioBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the storage selected by `[store]`.
    pub fn kv_store(
        mut self,
        kv: Arc<dyn KvStore>,
    ) -> Self {
        self.kv = Some(kv);
        self
    }

    /// Overrides the backend selected by `[backend]`.
    pub fn backend(
        mut self,
        backend: Arc<dyn WorkflowBackend>,
    ) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Overrides the policy built from `[retry]`.
    pub fn retry_policy(
        mut self,
        policy: RetryPolicy,
    ) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn build(self) -> Result<Studio> {
        let config = self.config.unwrap_or_default();
        config.check()?;

        let kv: Arc<dyn KvStore> = match self.kv {
            Some(kv) => kv,
            None => match config.store.store_type {
                StoreType::Mem => Arc::new(MemStore::new()),
                StoreType::File => {
                    let file = config.store.file.as_ref().ok_or_else(|| DiagflowError::Config("[store.file] is required when store_type is \"file\"".into()))?;
                    Arc::new(FileStore::new(&file.path)?)
                }
            },
        };

        let backend: Arc<dyn WorkflowBackend> = match (self.backend, &config.backend) {
            (Some(backend), _) => backend,
            (None, Some(remote)) => Arc::new(RestBackend::new(remote)?),
            (None, None) => {
                debug!("no backend configured, keeping workflows in memory");
                Arc::new(MemBackend::new())
            }
        };

        let retry = self.retry.unwrap_or_else(|| RetryPolicy::from(&config.retry));
        Ok(Studio::new(config, Store::new(kv), backend, retry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::builtin_templates;

    #[test]
    fn test_build_defaults() {
        let studio = StudioBuilder::new().build().unwrap();
        assert_eq!(studio.retry_policy(), &RetryPolicy::default());
        assert_eq!(studio.templates().all().len(), builtin_templates().len());
        assert!(studio.offline_queue().is_empty().unwrap());
    }

    #[test]
    fn test_build_from_config() {
        let dir = std::env::temp_dir().join(format!("diagflow-builder-{}", nanoid::nanoid!()));
        let config = Config::load_from_str(&format!(
            r#"
            [retry]
            max_attempts = 6

            [store]
            store_type = "file"

            [store.file]
            path = "{}"
            "#,
            dir.display()
        ))
        .unwrap();

        let studio = StudioBuilder::new().config(config).build().unwrap();
        assert_eq!(studio.retry_policy().max_attempts(), 6);
        studio.store().set_json("probe", &1).unwrap();
        assert!(dir.join("probe.json").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_file_store_requires_path() {
        let mut config = Config::default();
        config.store.store_type = StoreType::File;
        assert!(matches!(StudioBuilder::new().config(config).build(), Err(DiagflowError::Config(_))));
    }
}
