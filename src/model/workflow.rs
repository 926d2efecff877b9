use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    DiagflowError, Result,
    model::{WorkflowEdge, WorkflowNode},
};

/// The export/import file format.
///
/// `{ nodes, edges, nodeCounter, name?, folder?, appliance? }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
    #[serde(default)]
    pub node_counter: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appliance: Option<String>,
}

impl WorkflowDocument {
    /// Typed parse without structural validation. Use [`crate::exchange::import_document`] for untrusted input.
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str::<WorkflowDocument>(s).map_err(|e| DiagflowError::Workflow(format!("{}", e)))
    }
}

/// Descriptive fields of a saved workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appliance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl WorkflowMetadata {
    /// Fresh metadata with a new id and both timestamps set to now.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            folder: None,
            appliance: None,
            author: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            is_active: true,
        }
    }
}

/// A workflow as persisted by the application: metadata plus graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedWorkflow {
    #[serde(flatten)]
    pub metadata: WorkflowMetadata,
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
    #[serde(default)]
    pub node_counter: u64,
}

impl SavedWorkflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: WorkflowMetadata::new(name),
            nodes: Vec::new(),
            edges: Vec::new(),
            node_counter: 0,
        }
    }

    /// Builds a new saved workflow from an imported document.
    ///
    /// The document's name wins over `fallback_name` when present.
    pub fn from_document(
        doc: WorkflowDocument,
        fallback_name: &str,
    ) -> Self {
        let mut metadata = WorkflowMetadata::new(doc.name.clone().unwrap_or_else(|| fallback_name.to_string()));
        metadata.folder = doc.folder.clone();
        metadata.appliance = doc.appliance.clone();

        Self {
            metadata,
            nodes: doc.nodes,
            edges: doc.edges,
            node_counter: doc.node_counter,
        }
    }

    pub fn to_document(&self) -> WorkflowDocument {
        WorkflowDocument {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            node_counter: self.node_counter,
            name: Some(self.metadata.name.clone()),
            folder: self.metadata.folder.clone(),
            appliance: self.metadata.appliance.clone(),
        }
    }

    /// Replaces the graph and bumps `updatedAt`.
    pub fn apply_document(
        &mut self,
        doc: WorkflowDocument,
    ) {
        self.nodes = doc.nodes;
        self.edges = doc.edges;
        self.node_counter = doc.node_counter;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.metadata.updated_at = Utc::now();
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn enhanced_node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.kind.is_enhanced()).count()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{NodeType, Position};

    #[test]
    fn test_saved_workflow_wire_shape_is_flat() {
        let mut wf = SavedWorkflow::new("Ice maker");
        wf.metadata.folder = Some("Refrigeration".into());
        wf.nodes.push(WorkflowNode::new("node_1", Position::default(), NodeType::Question.default_kind()));
        wf.node_counter = 1;

        let value = serde_json::to_value(&wf).unwrap();
        assert_eq!(value["name"], "Ice maker");
        assert_eq!(value["folder"], "Refrigeration");
        assert_eq!(value["isActive"], true);
        assert_eq!(value["nodeCounter"], 1);
        assert!(value.get("metadata").is_none());

        let back: SavedWorkflow = serde_json::from_value(value).unwrap();
        assert_eq!(back, wf);
    }

    #[test]
    fn test_document_keeps_graph_and_grouping() {
        let mut wf = SavedWorkflow::new("Dryer no heat");
        wf.metadata.appliance = Some("dryer".into());
        wf.node_counter = 7;

        let doc = wf.to_document();
        assert_eq!(doc.name.as_deref(), Some("Dryer no heat"));
        assert_eq!(doc.appliance.as_deref(), Some("dryer"));
        assert_eq!(doc.node_counter, 7);

        let copy = SavedWorkflow::from_document(doc, "untitled");
        assert_ne!(copy.id(), wf.id());
        assert_eq!(copy.name(), "Dryer no heat");
        assert_eq!(copy.node_counter, 7);
    }

    #[test]
    fn test_from_json_without_counter() {
        let doc = WorkflowDocument::from_json(&json!({ "nodes": [], "edges": [] }).to_string()).unwrap();
        assert_eq!(doc.node_counter, 0);
        assert!(doc.name.is_none());
    }
}
