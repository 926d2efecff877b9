//! Persistence collaborator for saved workflows.
//!
//! The workflow core treats the backend as JSON in, JSON out. `RestBackend`
//! talks to a PostgREST-style table API; `MemBackend` keeps rows in memory.

use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    DiagflowError, Result, ShareLock,
    config::BackendConfig,
    model::{SavedWorkflow, WorkflowDocument, WorkflowMetadata},
    sync::transport::check_status,
};

#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    /// Inserts or replaces the workflow with the same id and returns that id.
    ///
    /// Must be idempotent: saving the same workflow twice leaves one record.
    async fn save_workflow(
        &self,
        workflow: &SavedWorkflow,
    ) -> Result<String>;

    async fn load_workflow(
        &self,
        id: &str,
    ) -> Result<SavedWorkflow>;

    /// All workflows, most recently updated first.
    async fn list_workflows(&self) -> Result<Vec<SavedWorkflow>>;

    /// Returns whether a record was deleted.
    async fn delete_workflow(
        &self,
        id: &str,
    ) -> Result<bool>;
}

/// In-memory [`WorkflowBackend`].
#[derive(Debug, Clone, Default)]
pub struct MemBackend {
    rows: ShareLock<BTreeMap<String, SavedWorkflow>>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_err<E: std::fmt::Display>(e: E) -> DiagflowError {
    DiagflowError::Store(e.to_string())
}

#[async_trait]
impl WorkflowBackend for MemBackend {
    async fn save_workflow(
        &self,
        workflow: &SavedWorkflow,
    ) -> Result<String> {
        let mut rows = self.rows.write().map_err(lock_err)?;
        rows.insert(workflow.id().to_string(), workflow.clone());
        Ok(workflow.id().to_string())
    }

    async fn load_workflow(
        &self,
        id: &str,
    ) -> Result<SavedWorkflow> {
        let rows = self.rows.read().map_err(lock_err)?;
        rows.get(id).cloned().ok_or_else(|| DiagflowError::Workflow(format!("workflow {} not found", id)))
    }

    async fn list_workflows(&self) -> Result<Vec<SavedWorkflow>> {
        let rows = self.rows.read().map_err(lock_err)?;
        let mut list: Vec<SavedWorkflow> = rows.values().cloned().collect();
        list.sort_by(|a, b| b.metadata.updated_at.cmp(&a.metadata.updated_at));
        Ok(list)
    }

    async fn delete_workflow(
        &self,
        id: &str,
    ) -> Result<bool> {
        let mut rows = self.rows.write().map_err(lock_err)?;
        Ok(rows.remove(id).is_some())
    }
}

/// Row shape of the workflows table; column names are snake_case.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkflowRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub folder: Option<String>,
    pub appliance: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub workflow_data: WorkflowDocument,
}

impl From<&SavedWorkflow> for WorkflowRow {
    fn from(workflow: &SavedWorkflow) -> Self {
        let m = &workflow.metadata;
        Self {
            id: m.id.clone(),
            name: m.name.clone(),
            description: m.description.clone(),
            folder: m.folder.clone(),
            appliance: m.appliance.clone(),
            author: m.author.clone(),
            tags: m.tags.clone(),
            is_active: m.is_active,
            created_at: m.created_at,
            updated_at: m.updated_at,
            workflow_data: WorkflowDocument {
                name: None,
                folder: None,
                appliance: None,
                ..workflow.to_document()
            },
        }
    }
}

impl From<WorkflowRow> for SavedWorkflow {
    fn from(row: WorkflowRow) -> Self {
        SavedWorkflow {
            metadata: WorkflowMetadata {
                id: row.id,
                name: row.name,
                description: row.description,
                folder: row.folder,
                appliance: row.appliance,
                author: row.author,
                tags: row.tags,
                created_at: row.created_at,
                updated_at: row.updated_at,
                is_active: row.is_active,
            },
            nodes: row.workflow_data.nodes,
            edges: row.workflow_data.edges,
            node_counter: row.workflow_data.node_counter,
        }
    }
}

/// [`WorkflowBackend`] over a PostgREST-style HTTP table API.
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    table: String,
    api_key: Option<String>,
    /// user access token; takes precedence over the api key as bearer token
    session: Option<String>,
}

impl RestBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| DiagflowError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            table: config.workflows_table.clone(),
            api_key: config.api_key.clone(),
            session: None,
        })
    }

    pub fn with_session(
        mut self,
        token: impl Into<String>,
    ) -> Self {
        self.session = Some(token.into());
        self
    }

    pub fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn authorize(
        &self,
        request: RequestBuilder,
    ) -> Result<RequestBuilder> {
        let token = self.session.as_ref().or(self.api_key.as_ref()).ok_or_else(|| DiagflowError::Auth("no session or api key configured".into()))?;
        let mut request = request.bearer_auth(token);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }
        Ok(request)
    }

    async fn fetch_rows(
        &self,
        query: &[(&str, String)],
    ) -> Result<Vec<WorkflowRow>> {
        let request = self.authorize(self.client.get(self.table_url()).query(query))?;
        let response = check_status(request.send().await?).await?;
        Ok(response.json::<Vec<WorkflowRow>>().await?)
    }
}

#[async_trait]
impl WorkflowBackend for RestBackend {
    async fn save_workflow(
        &self,
        workflow: &SavedWorkflow,
    ) -> Result<String> {
        trace!("rest_backend::save_workflow({})", workflow.id());
        let row = WorkflowRow::from(workflow);
        let request = self
            .client
            .post(self.table_url())
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row);
        check_status(self.authorize(request)?.send().await?).await?;
        debug!("workflow {} saved", row.id);
        Ok(row.id)
    }

    async fn load_workflow(
        &self,
        id: &str,
    ) -> Result<SavedWorkflow> {
        trace!("rest_backend::load_workflow({})", id);
        let rows = self.fetch_rows(&[("id", format!("eq.{}", id)), ("select", "*".to_string())]).await?;
        rows.into_iter().next().map(SavedWorkflow::from).ok_or_else(|| DiagflowError::Workflow(format!("workflow {} not found", id)))
    }

    async fn list_workflows(&self) -> Result<Vec<SavedWorkflow>> {
        let rows = self.fetch_rows(&[("select", "*".to_string()), ("order", "updated_at.desc".to_string())]).await?;
        Ok(rows.into_iter().map(SavedWorkflow::from).collect())
    }

    async fn delete_workflow(
        &self,
        id: &str,
    ) -> Result<bool> {
        trace!("rest_backend::delete_workflow({})", id);
        let request = self.client.delete(self.table_url()).query(&[("id", format!("eq.{}", id))]).header("Prefer", "return=representation");
        let response = check_status(self.authorize(request)?.send().await?).await?;
        let deleted = response.json::<Vec<WorkflowRow>>().await?;
        Ok(!deleted.is_empty())
    }
}
