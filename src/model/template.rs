use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{SavedWorkflow, WorkflowDocument, WorkflowEdge, WorkflowMetadata, WorkflowNode};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

/// A reusable, named starting workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// free-form estimate shown to technicians, e.g. `20-30 min`
    #[serde(default)]
    pub estimated_time: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
    /// built-in templates ship with the library and are immutable
    #[serde(default)]
    pub is_builtin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
    #[serde(default)]
    pub node_counter: u64,
}

impl WorkflowTemplate {
    /// Creates a new saved workflow seeded with a copy of this template's graph.
    pub fn instantiate(
        &self,
        name: Option<&str>,
    ) -> SavedWorkflow {
        let mut metadata = WorkflowMetadata::new(name.unwrap_or(&self.name));
        metadata.description = self.description.clone();
        metadata.folder = Some(self.category.clone());
        metadata.tags = self.tags.clone();

        SavedWorkflow {
            metadata,
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            node_counter: self.node_counter,
        }
    }

    pub fn to_document(&self) -> WorkflowDocument {
        WorkflowDocument {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            node_counter: self.node_counter,
            name: Some(self.name.clone()),
            folder: Some(self.category.clone()),
            appliance: None,
        }
    }
}

/// User input for a new user template; the library assigns id and timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateDraft {
    pub name: String,
    pub description: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub estimated_time: String,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub author: Option<String>,
    pub document: WorkflowDocument,
}

impl TemplateDraft {
    /// Draft a template from an existing workflow, carrying its name, description, tags and author.
    pub fn from_workflow(
        workflow: &SavedWorkflow,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: workflow.metadata.name.clone(),
            description: workflow.metadata.description.clone(),
            category: category.into(),
            tags: workflow.metadata.tags.clone(),
            author: workflow.metadata.author.clone(),
            document: workflow.to_document(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeType, Position};

    fn template() -> WorkflowTemplate {
        WorkflowTemplate {
            id: "tpl".into(),
            name: "Washer won't drain".into(),
            description: "Pump and hose checks".into(),
            category: "laundry".into(),
            difficulty: Difficulty::Intermediate,
            estimated_time: "30 min".into(),
            tags: vec!["pump".into()],
            is_public: true,
            is_builtin: true,
            author: None,
            created_at: None,
            nodes: vec![WorkflowNode::new("node_1", Position::default(), NodeType::Question.default_kind())],
            edges: vec![],
            node_counter: 1,
        }
    }

    #[test]
    fn test_instantiate_copies_graph_with_new_identity() {
        let tpl = template();
        let a = tpl.instantiate(None);
        let b = tpl.instantiate(Some("Unit 4B drain"));

        assert_ne!(a.id(), b.id());
        assert_eq!(a.name(), "Washer won't drain");
        assert_eq!(b.name(), "Unit 4B drain");
        assert_eq!(a.nodes, tpl.nodes);
        assert_eq!(a.node_counter, 1);
        assert_eq!(a.metadata.folder.as_deref(), Some("laundry"));
    }

    #[test]
    fn test_draft_from_workflow() {
        let mut wf = template().instantiate(None);
        wf.metadata.author = Some("kim".into());
        let draft = TemplateDraft::from_workflow(&wf, "custom");
        assert_eq!(draft.category, "custom");
        assert_eq!(draft.author.as_deref(), Some("kim"));
        assert_eq!(draft.document.nodes.len(), 1);
    }
}
