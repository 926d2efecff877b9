//! Studio: the entry point wiring configuration, storage, templates, the
//! backend and the offline queue together.
//!
//! Backend calls made by the studio (save, load, list, delete and the save
//! behind an import) run under the configured [`RetryPolicy`]; the same
//! policy drives offline replay.

use std::{future::Future, path::Path, sync::Arc};

use tracing::info;

use crate::{
    Config, DiagflowError, Result,
    exchange::{self, ImportLimits},
    model::SavedWorkflow,
    search::{SearchView, WorkflowFilter},
    store::Store,
    sync::{ConflictResolution, OfflineQueue, RetryPolicy, SyncReport, Transport, WorkflowBackend, resolve_conflict},
    templates::TemplateLibrary,
    validation::{ValidationResult, lint_workflow},
};

/// Name given to imported documents that carry none.
const IMPORTED_WORKFLOW_NAME: &str = "Imported workflow";

/// A workflow created by an import, with the validator's warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub workflow: SavedWorkflow,
    pub warnings: Vec<String>,
}

/// # Example
///
/// ```rust,ignore
/// let studio = StudioBuilder::new().config(Config::create("diagflow.toml")?).build()?;
///
/// let outcome = studio.import_workflow(&text).await?;
/// for warning in &outcome.warnings {
///     println!("{}", warning);
/// }
/// let issues = studio.validate(&outcome.workflow);
/// ```
pub struct Studio {
    config: Config,
    store: Store,
    backend: Arc<dyn WorkflowBackend>,
    retry: RetryPolicy,
    templates: TemplateLibrary,
    queue: OfflineQueue,
}

impl Studio {
    pub(crate) fn new(
        config: Config,
        store: Store,
        backend: Arc<dyn WorkflowBackend>,
        retry: RetryPolicy,
    ) -> Self {
        let templates = TemplateLibrary::load(store.clone(), config.keys.user_templates.clone());
        let queue = OfflineQueue::new(store.clone(), config.keys.offline_queue.clone());
        Self {
            config,
            store,
            backend,
            retry,
            templates,
            queue,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn backend(&self) -> Arc<dyn WorkflowBackend> {
        self.backend.clone()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    pub fn templates_mut(&mut self) -> &mut TemplateLibrary {
        &mut self.templates
    }

    pub fn offline_queue(&self) -> &OfflineQueue {
        &self.queue
    }

    fn import_limits(&self) -> ImportLimits {
        ImportLimits::from(&self.config.import)
    }

    /// Saves with retry and returns the record id.
    pub async fn save_workflow(
        &self,
        workflow: &SavedWorkflow,
    ) -> Result<String> {
        let id = self.retry.run("save workflow", |_| self.backend.save_workflow(workflow)).await?;
        info!("workflow {} saved", id);
        Ok(id)
    }

    /// Saves, then runs `follow_up` with the saved id.
    ///
    /// A failing follow-up is reported as [`DiagflowError::AfterSave`] so the
    /// caller knows the workflow itself was persisted.
    pub async fn save_then<F, Fut>(
        &self,
        workflow: &SavedWorkflow,
        follow_up: F,
    ) -> Result<String>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let id = self.save_workflow(workflow).await?;
        follow_up(id.clone()).await.map_err(|e| DiagflowError::AfterSave {
            id: id.clone(),
            message: e.to_string(),
        })?;
        Ok(id)
    }

    pub async fn load_workflow(
        &self,
        id: &str,
    ) -> Result<SavedWorkflow> {
        self.retry.run("load workflow", |_| self.backend.load_workflow(id)).await
    }

    pub async fn list_workflows(&self) -> Result<Vec<SavedWorkflow>> {
        self.retry.run("list workflows", |_| self.backend.list_workflows()).await
    }

    pub async fn delete_workflow(
        &self,
        id: &str,
    ) -> Result<bool> {
        self.retry.run("delete workflow", |_| self.backend.delete_workflow(id)).await
    }

    /// Loads every workflow into a search view with `filter` applied.
    pub async fn search(
        &self,
        filter: WorkflowFilter,
    ) -> Result<SearchView> {
        let mut view = SearchView::new(self.list_workflows().await?);
        view.set_filter(filter);
        Ok(view)
    }

    /// Validates import text, then persists it as a new workflow.
    pub async fn import_workflow(
        &self,
        text: &str,
    ) -> Result<ImportOutcome> {
        let imported = exchange::import_document(text, &self.import_limits())?;
        let workflow = SavedWorkflow::from_document(imported.document, IMPORTED_WORKFLOW_NAME);
        self.save_workflow(&workflow).await?;
        Ok(ImportOutcome {
            workflow,
            warnings: imported.warnings,
        })
    }

    pub async fn import_file<T: AsRef<Path>>(
        &self,
        path: T,
    ) -> Result<ImportOutcome> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        self.import_workflow(&text).await
    }

    pub fn export_workflow(
        &self,
        workflow: &SavedWorkflow,
    ) -> Result<String> {
        exchange::export_workflow(workflow)
    }

    /// Creates and saves a workflow from template `template_id`.
    pub async fn create_from_template(
        &self,
        template_id: &str,
        name: Option<&str>,
    ) -> Result<SavedWorkflow> {
        let workflow = self.templates.instantiate(template_id, name)?;
        self.save_workflow(&workflow).await?;
        Ok(workflow)
    }

    pub fn validate(
        &self,
        workflow: &SavedWorkflow,
    ) -> Vec<ValidationResult> {
        lint_workflow(workflow)
    }

    /// Resolves a conflict with the backend copy of `local` and saves the result.
    pub async fn resolve_and_save(
        &self,
        local: &SavedWorkflow,
        resolution: ConflictResolution,
    ) -> Result<SavedWorkflow> {
        let remote = self.load_workflow(local.id()).await?;
        let resolved = resolve_conflict(local, &remote, resolution);
        self.save_workflow(&resolved).await?;
        Ok(resolved)
    }

    /// Replays the offline queue through `transport`.
    pub async fn sync_offline(
        &self,
        transport: &dyn Transport,
    ) -> Result<SyncReport> {
        self.queue.replay(transport, &self.retry).await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicU32, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::{
        StudioBuilder,
        sync::{HttpMethod, MemBackend, PendingMutation},
    };

    /// Fails the first `failures` saves with a network error.
    struct FlakyBackend {
        inner: MemBackend,
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl WorkflowBackend for FlakyBackend {
        async fn save_workflow(
            &self,
            workflow: &SavedWorkflow,
        ) -> Result<String> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(DiagflowError::Network("connection reset".into()));
            }
            self.inner.save_workflow(workflow).await
        }

        async fn load_workflow(
            &self,
            id: &str,
        ) -> Result<SavedWorkflow> {
            self.inner.load_workflow(id).await
        }

        async fn list_workflows(&self) -> Result<Vec<SavedWorkflow>> {
            self.inner.list_workflows().await
        }

        async fn delete_workflow(
            &self,
            id: &str,
        ) -> Result<bool> {
            self.inner.delete_workflow(id).await
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3).initial_backoff(Duration::from_millis(1))
    }

    fn studio_with(backend: Arc<dyn WorkflowBackend>) -> Studio {
        StudioBuilder::new().backend(backend).retry_policy(fast_retry()).build().unwrap()
    }

    fn flaky(failures: u32) -> (Arc<FlakyBackend>, MemBackend) {
        let inner = MemBackend::new();
        let backend = Arc::new(FlakyBackend {
            inner: inner.clone(),
            failures,
            calls: AtomicU32::new(0),
        });
        (backend, inner)
    }

    const DOC: &str = r#"{
        "name": "Garbage disposal hums",
        "nodes": [
            { "id": "node_1", "type": "safety-warning", "position": { "x": 0, "y": 0 },
              "data": { "title": "Cut power", "hazardLevel": "high", "precautions": ["Switch off breaker"] } },
            { "id": "node_2", "type": "result", "position": { "x": 0, "y": 100 }, "data": { "title": "Free the flywheel" } }
        ],
        "edges": [ { "id": "e1", "source": "node_1", "target": "node_2" } ]
    }"#;

    #[tokio::test]
    async fn test_save_retries_until_success() {
        let (backend, inner) = flaky(2);
        let studio = studio_with(backend.clone());
        let wf = SavedWorkflow::new("Disposal");

        let id = studio.save_workflow(&wf).await.unwrap();
        assert_eq!(id, wf.id());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert_eq!(inner.len(), 1);
    }

    #[tokio::test]
    async fn test_save_gives_up_after_budget() {
        let (backend, inner) = flaky(5);
        let studio = studio_with(backend.clone());
        let err = studio.save_workflow(&SavedWorkflow::new("x")).await.unwrap_err();
        assert!(matches!(err, DiagflowError::Network(_)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert!(inner.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_reports_follow_up_failure() {
        let studio = studio_with(Arc::new(MemBackend::new()));
        let wf = SavedWorkflow::new("Range");

        let err = studio.save_then(&wf, |_| async { Err(DiagflowError::Workflow("navigation failed".into())) }).await.unwrap_err();
        match err {
            DiagflowError::AfterSave {
                id,
                message,
            } => {
                assert_eq!(id, wf.id());
                assert!(message.contains("navigation failed"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(studio.load_workflow(wf.id()).await.is_ok());
    }

    #[tokio::test]
    async fn test_import_persists_with_warnings() {
        let (backend, inner) = flaky(1);
        let studio = studio_with(backend);

        let outcome = studio.import_workflow(DOC).await.unwrap();
        assert_eq!(outcome.workflow.name(), "Garbage disposal hums");
        assert_eq!(outcome.workflow.node_counter, 2);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(inner.len(), 1);
        assert!(studio.validate(&outcome.workflow).iter().all(|r| r.severity != crate::validation::Severity::Error));
    }

    #[tokio::test]
    async fn test_invalid_import_is_not_saved() {
        let backend = MemBackend::new();
        let studio = studio_with(Arc::new(backend.clone()));
        let err = studio.import_workflow(r#"{ "nodes": [] }"#).await.unwrap_err();
        assert!(matches!(err, DiagflowError::Validation(_)));
        assert!(matches!(studio.import_workflow("not json").await, Err(DiagflowError::Parse(_))));
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_create_from_template_and_search() {
        let studio = studio_with(Arc::new(MemBackend::new()));
        studio.create_from_template("builtin_washer_no_drain", None).await.unwrap();
        studio.create_from_template("builtin_dishwasher_leak", Some("Kitchen leak")).await.unwrap();

        let view = studio.search(WorkflowFilter::default().text("pump")).await.unwrap();
        let names: Vec<&str> = view.results().iter().map(|w| w.name()).collect();
        assert_eq!(names, vec!["Washer won't drain"]);
        assert_eq!(view.facets().categories, vec!["Dishwashers", "Laundry"]);
    }

    #[tokio::test]
    async fn test_resolve_and_save_keeps_remote_id() {
        let studio = studio_with(Arc::new(MemBackend::new()));
        let remote = studio.create_from_template("builtin_dryer_no_heat", None).await.unwrap();
        let mut local = remote.clone();
        local.metadata.name = "Dryer no heat (shop copy)".into();

        let resolved = studio.resolve_and_save(&local, ConflictResolution::KeepLocal).await.unwrap();
        assert_eq!(resolved.id(), remote.id());
        assert_eq!(studio.load_workflow(remote.id()).await.unwrap().name(), "Dryer no heat (shop copy)");
        assert_eq!(studio.list_workflows().await.unwrap().len(), 1);
    }

    struct Offline;

    #[async_trait]
    impl Transport for Offline {
        async fn send(
            &self,
            _mutation: &PendingMutation,
        ) -> Result<()> {
            Err(DiagflowError::Network("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_sync_offline_keeps_failed_items() {
        let studio = studio_with(Arc::new(MemBackend::new()));
        studio.offline_queue().enqueue(PendingMutation::new("/rest/v1/diagnostic_workflows", HttpMethod::Post, Some(json!({ "id": "wf" })))).unwrap();

        let report = studio.sync_offline(&Offline).await.unwrap();
        assert_eq!(report.synced, 0);
        assert_eq!(report.pending, 1);
        assert_eq!(studio.offline_queue().pending().unwrap()[0].attempts, 1);
    }
}
