//! Resolution of a workflow edited both locally and remotely.
//!
//! A conflict exists when both copies changed after the last successful sync
//! and their content differs. Resolution is always an explicit caller choice.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{SavedWorkflow, WorkflowEdge};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConflictResolution {
    /// keep the local copy, discarding remote changes
    KeepLocal,
    /// take the remote copy, discarding local changes
    KeepRemote,
    /// union of both graphs; the more recently updated side wins per node and edge
    Merge,
}

pub fn has_conflict(
    local: &SavedWorkflow,
    remote: &SavedWorkflow,
    last_synced_at: DateTime<Utc>,
) -> bool {
    let both_changed = local.metadata.updated_at > last_synced_at && remote.metadata.updated_at > last_synced_at;
    let differs = local.nodes != remote.nodes || local.edges != remote.edges || local.metadata.name != remote.metadata.name;
    both_changed && differs
}

/// Produces the workflow to persist. The result keeps the remote id.
pub fn resolve_conflict(
    local: &SavedWorkflow,
    remote: &SavedWorkflow,
    resolution: ConflictResolution,
) -> SavedWorkflow {
    debug!("resolving conflict on {} with {}", remote.id(), resolution.as_ref());
    let mut resolved = match resolution {
        ConflictResolution::KeepLocal => local.clone(),
        ConflictResolution::KeepRemote => remote.clone(),
        ConflictResolution::Merge => merge(local, remote),
    };
    resolved.metadata.id = remote.metadata.id.clone();
    resolved.metadata.created_at = local.metadata.created_at.min(remote.metadata.created_at);
    resolved.touch();
    resolved
}

fn merge(
    local: &SavedWorkflow,
    remote: &SavedWorkflow,
) -> SavedWorkflow {
    let (newer, older) = if local.metadata.updated_at >= remote.metadata.updated_at { (local, remote) } else { (remote, local) };

    let mut merged = newer.clone();

    let node_ids: HashSet<String> = merged.nodes.iter().map(|n| n.id.clone()).collect();
    merged.nodes.extend(older.nodes.iter().filter(|n| !node_ids.contains(&n.id)).cloned());

    let edge_ids: HashSet<String> = merged.edges.iter().map(|e| e.id.clone()).collect();
    merged.edges.extend(older.edges.iter().filter(|e| !edge_ids.contains(&e.id)).cloned());

    // edges must reference surviving nodes, and one edge per ordered pair
    let node_ids: HashSet<&str> = merged.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut pairs = HashSet::new();
    let edges: Vec<WorkflowEdge> = merged
        .edges
        .iter()
        .filter(|e| node_ids.contains(e.source.as_str()) && node_ids.contains(e.target.as_str()))
        .filter(|e| pairs.insert((e.source.clone(), e.target.clone())))
        .cloned()
        .collect();
    merged.edges = edges;

    for tag in &older.metadata.tags {
        if !merged.metadata.tags.contains(tag) {
            merged.metadata.tags.push(tag.clone());
        }
    }
    merged.node_counter = local.node_counter.max(remote.node_counter);
    merged
}
