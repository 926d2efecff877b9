//! Lint rules over a workflow graph.
//!
//! Rule ids are `<category>.<rule>` so the panel can group them. Graph-wide
//! rules run first, then per-node rules in node order.

use std::collections::{HashMap, HashSet};

use petgraph::{algo::tarjan_scc, visit::Dfs};

use crate::{
    model::{HazardLevel, NodeKind, SavedWorkflow, WorkflowNode},
    validation::{Severity, ValidationResult},
    workflow::WorkflowGraph,
};

/// Titles longer than this are hard to read on small screens.
pub const MAX_TITLE_CHARS: usize = 80;

pub fn lint_workflow(workflow: &SavedWorkflow) -> Vec<ValidationResult> {
    lint(&WorkflowGraph::from(workflow))
}

pub fn lint(graph: &WorkflowGraph) -> Vec<ValidationResult> {
    let mut results = Vec::new();
    if graph.nodes().is_empty() {
        results.push(
            ValidationResult::new("structure.empty", Severity::Error, "Workflow has no nodes").suggest("Add a question node to start the diagnosis"),
        );
        return results;
    }

    check_ids(graph, &mut results);
    check_edges(graph, &mut results);
    check_flow(graph, &mut results);
    for node in graph.nodes() {
        check_node(graph, node, &mut results);
    }
    results
}

fn label(node: &WorkflowNode) -> String {
    if node.title().trim().is_empty() { node.id.clone() } else { format!("'{}'", node.title()) }
}

fn check_ids(
    graph: &WorkflowGraph,
    results: &mut Vec<ValidationResult>,
) {
    let mut seen = HashSet::new();
    for node in graph.nodes() {
        if !seen.insert(node.id.as_str()) {
            results.push(
                ValidationResult::new("structure.duplicate-node-id", Severity::Error, format!("Node id {} is used more than once", node.id))
                    .node(node.id.clone()),
            );
        }
    }

    let mut seen = HashSet::new();
    for edge in graph.edges() {
        if !seen.insert(edge.id.as_str()) {
            results.push(ValidationResult::new("structure.duplicate-edge-id", Severity::Error, format!("Edge id {} is used more than once", edge.id)));
        }
    }
}

fn check_edges(
    graph: &WorkflowGraph,
    results: &mut Vec<ValidationResult>,
) {
    for edge in graph.edges() {
        for endpoint in [&edge.source, &edge.target] {
            if !graph.contains_node(endpoint) {
                results.push(
                    ValidationResult::new("structure.dangling-edge", Severity::Error, format!("Edge {} points to missing node {}", edge.id, endpoint))
                        .suggest("Delete the connection or restore the node"),
                );
            }
        }
    }
}

/// Entry points, orphans, reachability, cycles and dead ends.
fn check_flow(
    graph: &WorkflowGraph,
    results: &mut Vec<ValidationResult>,
) {
    let single = graph.nodes().len() == 1;
    let orphans: HashSet<&str> = if single {
        HashSet::new()
    } else {
        graph.nodes().iter().filter(|n| graph.outgoing(&n.id).is_empty() && graph.incoming(&n.id).is_empty()).map(|n| n.id.as_str()).collect()
    };
    for node in graph.nodes().iter().filter(|n| orphans.contains(n.id.as_str())) {
        results.push(
            ValidationResult::new("structure.orphan-node", Severity::Warning, format!("Node {} is not connected to anything", label(node)))
                .node(node.id.clone())
                .suggest("Connect the node or delete it"),
        );
    }

    let entries: Vec<&WorkflowNode> = graph.entry_nodes().into_iter().filter(|n| !orphans.contains(n.id.as_str())).collect();
    if orphans.len() == graph.nodes().len() {
        return;
    }
    match entries.len() {
        0 => results.push(
            ValidationResult::new("structure.no-entry", Severity::Error, "Every node has an incoming connection, so there is no starting step")
                .suggest("Remove the connection leading into the first step"),
        ),
        1 => {}
        _ => {
            for extra in &entries[1..] {
                results.push(
                    ValidationResult::new(
                        "structure.multiple-entries",
                        Severity::Warning,
                        format!("Node {} is a second starting point besides {}", label(extra), label(entries[0])),
                    )
                    .node(extra.id.clone()),
                );
            }
        }
    }

    let (digraph, indices) = graph.to_digraph();
    let order: HashMap<&str, usize> = graph.nodes().iter().enumerate().map(|(i, n)| (n.id.as_str(), i)).collect();

    if !entries.is_empty() {
        let mut reached = HashSet::new();
        for entry in &entries {
            if let Some(&start) = indices.get(&entry.id) {
                let mut dfs = Dfs::new(&digraph, start);
                while let Some(idx) = dfs.next(&digraph) {
                    reached.insert(digraph[idx].as_str());
                }
            }
        }
        for node in graph.nodes() {
            if !reached.contains(node.id.as_str()) && !orphans.contains(node.id.as_str()) {
                results.push(
                    ValidationResult::new("logic.unreachable", Severity::Warning, format!("Node {} cannot be reached from the start", label(node)))
                        .node(node.id.clone()),
                );
            }
        }
    }

    for component in tarjan_scc(&digraph) {
        let looped = component.len() > 1 || component.first().is_some_and(|&idx| digraph.find_edge(idx, idx).is_some());
        if !looped {
            continue;
        }
        let mut ids: Vec<&str> = component.iter().map(|&idx| digraph[idx].as_str()).collect();
        ids.sort_by_key(|id| order.get(id).copied().unwrap_or(usize::MAX));
        results.push(
            ValidationResult::new("logic.cycle", Severity::Warning, format!("Steps {} form a loop", ids.join(" -> ")))
                .node(ids[0].to_string())
                .suggest("Make sure the loop has an exit the technician can take"),
        );
    }

    if !single {
        for node in graph.nodes() {
            let terminal = matches!(node.kind, NodeKind::Result(_));
            if !terminal && !orphans.contains(node.id.as_str()) && graph.outgoing(&node.id).is_empty() {
                results.push(
                    ValidationResult::new("logic.dead-end", Severity::Warning, format!("Node {} has no next step", label(node)))
                        .node(node.id.clone())
                        .suggest("Connect it to a following step or a result"),
                );
            }
        }
    }
}

fn check_node(
    graph: &WorkflowGraph,
    node: &WorkflowNode,
    results: &mut Vec<ValidationResult>,
) {
    let id = node.id.clone();
    let name = label(node);
    let mut push = |rule: &str, severity: Severity, message: String, suggestion: Option<&str>| {
        let mut result = ValidationResult::new(rule, severity, message).node(id.clone());
        if let Some(s) = suggestion {
            result = result.suggest(s);
        }
        results.push(result);
    };

    if node.title().trim().is_empty() {
        push("content.missing-title", Severity::Warning, format!("Node {} has no title", node.id), Some("Give the step a short descriptive title"));
    } else if node.title().chars().count() > MAX_TITLE_CHARS {
        push(
            "accessibility.long-title",
            Severity::Info,
            format!("Title of {} is longer than {} characters", node.id, MAX_TITLE_CHARS),
            Some("Move details into the content field"),
        );
    }

    let outgoing = graph.outgoing(&node.id).len();
    match &node.kind {
        NodeKind::Question(data) => {
            if data.content.trim().is_empty() {
                push("content.missing-content", Severity::Info, format!("Question {} has no explanation", name), None);
            }
        }
        NodeKind::Choice(data) => {
            if data.options.is_empty() {
                push("content.empty-options", Severity::Error, format!("Choice {} has no options", name), Some("Add at least two options"));
            } else if data.options.len() > outgoing {
                push(
                    "logic.choice-branches",
                    Severity::Warning,
                    format!("Choice {} has {} options but {} outgoing connections", name, data.options.len(), outgoing),
                    Some("Connect every option to a following step"),
                );
            }
            if data.options.iter().any(|o| o.label.trim().is_empty()) {
                push("accessibility.option-label", Severity::Warning, format!("Choice {} has an option without a label", name), None);
            }
        }
        NodeKind::Result(data) => {
            if data.resolution.as_deref().is_none_or(|r| r.trim().is_empty()) {
                push("content.missing-resolution", Severity::Info, format!("Result {} does not describe the fix", name), None);
            }
        }
        NodeKind::EquipmentTest(data) => {
            if data.equipment.trim().is_empty() {
                push("content.missing-equipment", Severity::Warning, format!("Test {} does not name the equipment", name), Some("Name the meter or tool to use"));
            }
        }
        NodeKind::PhotoCapture(data) => {
            if data.instructions.trim().is_empty() {
                push(
                    "accessibility.photo-instructions",
                    Severity::Warning,
                    format!("Photo step {} has no instructions", name),
                    Some("Describe what the photo must show"),
                );
            }
        }
        NodeKind::ProcedureStep(data) => {
            if data.steps.is_empty() {
                push("content.empty-steps", Severity::Warning, format!("Procedure {} has no steps", name), None);
            }
        }
        NodeKind::DecisionTree(data) => {
            if data.branches.is_empty() {
                push("content.empty-branches", Severity::Error, format!("Decision {} has no branches", name), Some("Add a branch per outcome"));
            } else if data.branches.len() > outgoing {
                push(
                    "logic.decision-branches",
                    Severity::Warning,
                    format!("Decision {} has {} branches but {} outgoing connections", name, data.branches.len(), outgoing),
                    None,
                );
            }
        }
        NodeKind::VoltageCheck(data) => {
            if let (Some(min), Some(max)) = (data.min_volts, data.max_volts) {
                if min > max {
                    push("logic.voltage-range", Severity::Error, format!("Voltage check {} expects {} V min above {} V max", name, min, max), None);
                }
            }
            if data.test_points.is_empty() {
                push("content.missing-test-points", Severity::Warning, format!("Voltage check {} has no test points", name), None);
            }
        }
        NodeKind::ResistanceCheck(data) => {
            if data.tolerance_percent.is_some_and(|t| !(0.0..=100.0).contains(&t)) {
                push("logic.resistance-tolerance", Severity::Warning, format!("Resistance check {} has a tolerance outside 0-100%", name), None);
            }
            if data.test_points.is_empty() {
                push("content.missing-test-points", Severity::Warning, format!("Resistance check {} has no test points", name), None);
            }
        }
        NodeKind::DataForm(data) => {
            if data.fields.is_empty() {
                push("content.empty-form", Severity::Warning, format!("Form {} has no fields", name), Some("Add the readings the technician should record"));
            }
            let mut names = HashSet::new();
            for field in &data.fields {
                if !names.insert(field.name.as_str()) {
                    push("logic.duplicate-field", Severity::Error, format!("Form {} repeats field {}", name, field.name), None);
                }
                if field.label.trim().is_empty() {
                    push("accessibility.field-label", Severity::Warning, format!("Field {} in form {} has no label", field.name, name), None);
                }
            }
        }
        NodeKind::TimedStep(data) => {
            if data.duration_seconds == 0 {
                push("content.zero-duration", Severity::Warning, format!("Timed step {} has no duration", name), None);
            }
        }
        NodeKind::SafetyWarning(data) => {
            if data.precautions.is_empty() {
                let severity = if data.hazard_level >= HazardLevel::High { Severity::Error } else { Severity::Warning };
                push("content.safety-precautions", severity, format!("Safety warning {} lists no precautions", name), Some("List the precautions to take"));
            }
        }
    }
}
