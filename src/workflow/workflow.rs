//! Editor-side workflow graph.
//!
//! `WorkflowGraph` owns the ordered node and edge lists of one workflow and
//! performs the editor's mutations on them. Node order is meaningful (it is
//! the order steps are listed and drag-reordered in), so the lists are the
//! source of truth; a petgraph view is built on demand for analysis.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::{
    DiagflowError, Result,
    model::{EdgeId, NodeId, NodeKind, Position, SavedWorkflow, WorkflowDocument, WorkflowEdge, WorkflowNode},
};

/// Offset applied to a duplicated node so it does not sit exactly on the original.
const DUPLICATE_OFFSET: f64 = 40.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowGraph {
    nodes: Vec<WorkflowNode>,
    edges: Vec<WorkflowEdge>,
    /// last number handed out for a generated node id
    node_counter: u64,
}

impl WorkflowGraph {
    /// create a new workflow graph
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(doc: WorkflowDocument) -> Self {
        Self {
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
            ..Default::default()
        }
    }

    /// Writes the graph back into a saved workflow, bumping its `updatedAt`.
    pub fn store_into(
        &self,
        workflow: &mut SavedWorkflow,
    ) {
        workflow.nodes = self.nodes.clone();
        workflow.edges = self.edges.clone();
        workflow.node_counter = self.node_counter;
        workflow.touch();
    }

    /// Output a human-readable representation of the workflow graph
    pub fn schema(&self) -> String {
        let mut lines = Vec::new();

        lines.push("=== Workflow Graph ===".to_string());
        lines.push(format!("Nodes: {}, Edges: {}", self.nodes.len(), self.edges.len()));
        lines.push(String::new());

        lines.push("--- Nodes ---".to_string());
        for node in &self.nodes {
            lines.push(format!("[{}] {} (type: {}, at: {}, {})", node.id, node.title(), node.node_type(), node.position.x, node.position.y));
        }
        lines.push(String::new());

        lines.push("--- Edges ---".to_string());
        for edge in &self.edges {
            let label = edge.label.as_deref().unwrap_or("-");
            lines.push(format!("{} --[{}]--> {} (id: {})", edge.source, label, edge.target, edge.id));
        }
        lines.push(String::new());

        lines.push("--- Graph Structure ---".to_string());
        for node in &self.nodes {
            let outgoing: Vec<&str> = self.outgoing(&node.id).iter().map(|e| e.target.as_str()).collect();
            if outgoing.is_empty() {
                lines.push(format!("{} -> (end)", node.id));
            } else {
                lines.push(format!("{} -> {}", node.id, outgoing.join(", ")));
            }
        }

        lines.join("\n")
    }

    pub fn nodes(&self) -> &[WorkflowNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[WorkflowEdge] {
        &self.edges
    }

    pub fn node_counter(&self) -> u64 {
        self.node_counter
    }

    /// get node by id
    pub fn get_node(
        &self,
        id: &str,
    ) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// get edge by id
    pub fn get_edge(
        &self,
        id: &str,
    ) -> Option<&WorkflowEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn contains_node(
        &self,
        id: &str,
    ) -> bool {
        self.get_node(id).is_some()
    }

    /// Adds a node with a generated id and returns that id.
    ///
    /// Fails once the id counter is exhausted.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        position: Position,
    ) -> Result<NodeId> {
        let id = self.next_node_id()?;
        debug!("graph::add_node({}, {})", id, kind.node_type());
        self.nodes.push(WorkflowNode::new(id.clone(), position, kind));
        Ok(id)
    }

    /// Copies a node (payload and position offset), without its edges.
    pub fn duplicate_node(
        &mut self,
        id: &str,
    ) -> Result<NodeId> {
        let source = self.get_node(id).ok_or_else(|| node_not_found(id))?;
        let kind = source.kind.clone();
        let position = Position::new(source.position.x + DUPLICATE_OFFSET, source.position.y + DUPLICATE_OFFSET);
        self.add_node(kind, position)
    }

    /// Replaces the payload of a node; the node may change type.
    pub fn update_node(
        &mut self,
        id: &str,
        kind: NodeKind,
    ) -> Result<()> {
        let node = self.node_mut(id)?;
        node.kind = kind;
        Ok(())
    }

    pub fn move_node(
        &mut self,
        id: &str,
        position: Position,
    ) -> Result<()> {
        let node = self.node_mut(id)?;
        node.position = position;
        Ok(())
    }

    /// Removes a node and every edge touching it.
    pub fn remove_node(
        &mut self,
        id: &str,
    ) -> Result<WorkflowNode> {
        let idx = self.nodes.iter().position(|n| n.id == id).ok_or_else(|| node_not_found(id))?;
        let node = self.nodes.remove(idx);
        let before = self.edges.len();
        self.edges.retain(|e| !e.touches(id));
        debug!("graph::remove_node({}) dropped {} edges", id, before - self.edges.len());
        Ok(node)
    }

    /// Moves the node at `from` to position `to` in the node list.
    pub fn reorder_node(
        &mut self,
        from: usize,
        to: usize,
    ) -> Result<()> {
        let len = self.nodes.len();
        if from >= len || to >= len {
            return Err(DiagflowError::Node(format!("reorder index out of range: {} -> {} (len {})", from, to, len)));
        }
        let node = self.nodes.remove(from);
        self.nodes.insert(to, node);
        Ok(())
    }

    /// Connects two existing nodes and returns the new edge id.
    ///
    /// Self-loops and a second edge between the same ordered pair are rejected.
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        edge_type: Option<String>,
    ) -> Result<EdgeId> {
        if !self.contains_node(source) {
            return Err(DiagflowError::Edge(format!("source node {} not found", source)));
        }
        if !self.contains_node(target) {
            return Err(DiagflowError::Edge(format!("target node {} not found", target)));
        }
        if source == target {
            return Err(DiagflowError::Edge(format!("node {} cannot connect to itself", source)));
        }
        if self.edges.iter().any(|e| e.source == source && e.target == target) {
            return Err(DiagflowError::Edge(format!("{} is already connected to {}", source, target)));
        }

        let mut id = format!("edge_{}_{}", source, target);
        if self.get_edge(&id).is_some() {
            id = format!("{}_{}", id, nanoid::nanoid!(6));
        }
        let mut edge = WorkflowEdge::new(id.clone(), source, target);
        edge.edge_type = edge_type;
        self.edges.push(edge);
        Ok(id)
    }

    pub fn set_edge_label(
        &mut self,
        id: &str,
        label: Option<String>,
    ) -> Result<()> {
        let edge = self.edges.iter_mut().find(|e| e.id == id).ok_or_else(|| DiagflowError::Edge(format!("edge {} not found", id)))?;
        edge.label = label;
        Ok(())
    }

    pub fn disconnect(
        &mut self,
        id: &str,
    ) -> Result<WorkflowEdge> {
        let idx = self.edges.iter().position(|e| e.id == id).ok_or_else(|| DiagflowError::Edge(format!("edge {} not found", id)))?;
        Ok(self.edges.remove(idx))
    }

    /// Get all outgoing edges from a node
    pub fn outgoing(
        &self,
        nid: &str,
    ) -> Vec<&WorkflowEdge> {
        self.edges.iter().filter(|e| e.source == nid).collect()
    }

    /// Get all incoming edges to a node
    pub fn incoming(
        &self,
        nid: &str,
    ) -> Vec<&WorkflowEdge> {
        self.edges.iter().filter(|e| e.target == nid).collect()
    }

    /// Nodes without incoming edges, in list order.
    pub fn entry_nodes(&self) -> Vec<&WorkflowNode> {
        let targets: HashSet<&str> = self.edges.iter().map(|e| e.target.as_str()).collect();
        self.nodes.iter().filter(|n| !targets.contains(n.id.as_str())).collect()
    }

    /// Case-insensitive search over node title, content and type tag.
    pub fn find_nodes(
        &self,
        text: &str,
    ) -> Vec<&WorkflowNode> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return self.nodes.iter().collect();
        }
        self.nodes
            .iter()
            .filter(|n| {
                n.title().to_lowercase().contains(&needle) || n.content().to_lowercase().contains(&needle) || n.node_type().as_ref().contains(&needle)
            })
            .collect()
    }

    /// Directed graph view of the workflow. Edges with unknown endpoints are left out.
    pub fn to_digraph(&self) -> (DiGraph<NodeId, EdgeId>, HashMap<NodeId, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut indices = HashMap::new();
        for node in &self.nodes {
            let idx = graph.add_node(node.id.clone());
            indices.entry(node.id.clone()).or_insert(idx);
        }
        for edge in &self.edges {
            if let (Some(src), Some(dst)) = (indices.get(&edge.source), indices.get(&edge.target)) {
                graph.add_edge(*src, *dst, edge.id.clone());
            }
        }
        (graph, indices)
    }

    fn node_mut(
        &mut self,
        id: &str,
    ) -> Result<&mut WorkflowNode> {
        self.nodes.iter_mut().find(|n| n.id == id).ok_or_else(|| node_not_found(id))
    }

    fn next_node_id(&mut self) -> Result<NodeId> {
        loop {
            self.node_counter = self
                .node_counter
                .checked_add(1)
                .ok_or_else(|| DiagflowError::Workflow(format!("node id counter exhausted at {}", self.node_counter)))?;
            let id = format!("node_{}", self.node_counter);
            if !self.contains_node(&id) {
                return Ok(id);
            }
        }
    }
}

impl From<&SavedWorkflow> for WorkflowGraph {
    fn from(workflow: &SavedWorkflow) -> Self {
        Self {
            nodes: workflow.nodes.clone(),
            edges: workflow.edges.clone(),
            node_counter: workflow.node_counter,
        }
    }
}

/// Smallest counter that keeps generated ids clear of the given nodes.
///
/// Used when a document arrives without a usable `nodeCounter`.
pub fn derive_node_counter(nodes: &[WorkflowNode]) -> u64 {
    let max_suffix = nodes
        .iter()
        .filter_map(|n| n.id.rsplit(|c: char| c == '_' || c == '-').next().and_then(|s| s.parse::<u64>().ok()))
        .max()
        .unwrap_or(0);
    max_suffix.max(nodes.len() as u64)
}

fn node_not_found(id: &str) -> DiagflowError {
    DiagflowError::Node(format!("node {} not found", id))
}
