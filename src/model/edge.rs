use serde::{Deserialize, Serialize};

use crate::model::NodeId;

/// edge id
pub type EdgeId = String;

/// Transition between two workflow nodes.
///
/// `source` and `target` must name existing nodes. The type system does not
/// enforce it; import validation, the editor and the linter do.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    /// renderer hint, e.g. `smoothstep`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    /// answer or branch label shown on the connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl WorkflowEdge {
    pub fn new(
        id: impl Into<EdgeId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            edge_type: None,
            label: None,
        }
    }

    pub fn with_label(
        mut self,
        label: impl Into<String>,
    ) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Whether this edge touches the given node.
    pub fn touches(
        &self,
        nid: &str,
    ) -> bool {
        self.source == nid || self.target == nid
    }
}
