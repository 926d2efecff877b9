use std::{collections::HashSet, path::Path, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    DiagflowError, Result,
    config::ImportConfig,
    exchange::ImportReport,
    model::{NodeKind, NodeType, Position, WorkflowDocument, WorkflowEdge, WorkflowNode},
    workflow::derive_node_counter,
};

/// Script tags (opening or closing) and `javascript:` URIs, case-insensitive.
const UNSAFE_CONTENT_PATTERN: &str = r"(?i)<\s*/?\s*script\b|javascript\s*:";

static UNSAFE_CONTENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(UNSAFE_CONTENT_PATTERN).unwrap());

/// Thresholds above which an import is flagged with a warning. They never reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportLimits {
    pub max_bytes: usize,
    pub max_nodes: usize,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
            max_nodes: 1000,
        }
    }
}

impl From<&ImportConfig> for ImportLimits {
    fn from(config: &ImportConfig) -> Self {
        Self {
            max_bytes: config.max_bytes,
            max_nodes: config.max_nodes,
        }
    }
}

/// A document that passed validation, with the warnings raised on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedDocument {
    pub document: WorkflowDocument,
    pub warnings: Vec<String>,
}

/// Parses import text. Invalid JSON is a [`DiagflowError::Parse`].
pub fn parse_json(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| DiagflowError::Parse(format!("invalid JSON: {}", e)))
}

/// Validates an untyped import payload without converting it.
pub fn validate_document(
    value: &Value,
    limits: &ImportLimits,
) -> ImportReport {
    let mut report = ImportReport::default();

    let serialized = value.to_string();
    if UNSAFE_CONTENT.is_match(&serialized) {
        report.error("Workflow contains potentially unsafe content (script tags or javascript: URIs)");
    }
    if serialized.len() > limits.max_bytes {
        report.warn(format!("Workflow is large ({} bytes); importing may be slow", serialized.len()));
    }

    let Some(root) = value.as_object() else {
        report.error("Workflow file must contain a JSON object");
        return report.finish();
    };

    let nodes = root.get("nodes").and_then(Value::as_array);
    let edges = root.get("edges").and_then(Value::as_array);
    if nodes.is_none() {
        report.error("Missing or invalid 'nodes' array");
    }
    if edges.is_none() {
        report.error("Missing or invalid 'edges' array");
    }

    let mut node_ids = HashSet::new();
    if let Some(nodes) = nodes {
        if nodes.len() >= limits.max_nodes {
            report.warn(format!("Workflow has {} nodes ({}+); editing may be slow", nodes.len(), limits.max_nodes));
        }
        for (idx, node) in nodes.iter().enumerate() {
            if let Some(id) = check_node(idx, node, &mut report) {
                if !node_ids.insert(id.to_string()) {
                    report.error(format!("Duplicate node id '{}'", id));
                }
            }
        }
    }

    if let Some(edges) = edges {
        for (idx, edge) in edges.iter().enumerate() {
            check_edge(idx, edge, nodes.is_some().then_some(&node_ids), &mut report);
        }
    }

    match root.get("nodeCounter") {
        None => report.warn("Missing nodeCounter; it will be derived from node ids"),
        Some(counter) if counter.as_u64().is_none() => report.warn("Invalid nodeCounter; it will be derived from node ids"),
        Some(_) => {}
    }

    report.finish()
}

/// Validates one node and returns its id when it has a usable one.
fn check_node<'a>(
    idx: usize,
    node: &'a Value,
    report: &mut ImportReport,
) -> Option<&'a str> {
    let Some(obj) = node.as_object() else {
        report.error(format!("Node at index {} is not an object", idx));
        return None;
    };

    let id = obj.get("id").and_then(Value::as_str).filter(|id| !id.trim().is_empty());
    let Some(id) = id else {
        report.error(format!("Node at index {} is missing an id", idx));
        return None;
    };

    let node_type = match obj.get("type") {
        None | Some(Value::Null) => {
            report.warn(format!("Node '{}' has no type; treating it as a question", id));
            Some(NodeType::Question)
        }
        Some(Value::String(tag)) => match NodeType::from_str(tag) {
            Ok(t) => Some(t),
            Err(_) => {
                report.error(format!("Node '{}' has unknown type '{}'", id, tag));
                None
            }
        },
        Some(_) => {
            report.error(format!("Node '{}' has an invalid type", id));
            None
        }
    };

    let position = obj.get("position").and_then(Value::as_object);
    let numeric = |key: &str| position.and_then(|p| p.get(key)).map(Value::is_number).unwrap_or(false);
    if !numeric("x") || !numeric("y") {
        report.error(format!("Node '{}' is missing a valid position (numeric x and y)", id));
    }

    match (obj.get("data"), node_type) {
        (None | Some(Value::Null), _) => report.warn(format!("Node '{}' has no data", id)),
        (Some(data), Some(node_type)) => {
            if let Err(e) = jsonschema::validate(&node_type.schema(), data) {
                report.error(format!("Node '{}' has invalid {} data: {}", id, node_type, e));
            } else if let Err(e) = NodeKind::from_data(node_type, data.clone()) {
                // the schema admits some values the typed payload does not, e.g. 30.0 for an integer
                report.error(format!("Node '{}' has unusable {} data: {}", id, node_type, e));
            }
        }
        (Some(_), None) => {}
    }

    Some(id)
}

fn check_edge(
    idx: usize,
    edge: &Value,
    node_ids: Option<&HashSet<String>>,
    report: &mut ImportReport,
) {
    let Some(obj) = edge.as_object() else {
        report.error(format!("Edge at index {} is not an object", idx));
        return;
    };

    let field = |key: &str| obj.get(key).and_then(Value::as_str).filter(|s| !s.is_empty());
    let label = field("id").map(|id| format!("Edge '{}'", id)).unwrap_or_else(|| format!("Edge at index {}", idx));

    for key in ["id", "source", "target"] {
        if field(key).is_none() {
            report.error(format!("{} is missing {}", label, key));
        }
    }

    for key in ["label", "type"] {
        if !matches!(obj.get(key), None | Some(Value::Null | Value::String(_))) {
            report.error(format!("{} has a non-string {}", label, key));
        }
    }

    let Some(node_ids) = node_ids else {
        return;
    };
    for key in ["source", "target"] {
        if let Some(nid) = field(key) {
            if !node_ids.contains(nid) {
                report.error(format!("{} references unknown {} node '{}'", label, key, nid));
            }
        }
    }
}

/// Converts a payload that passed [`validate_document`] into a typed document.
fn convert(value: Value) -> Result<WorkflowDocument> {
    let mut root = match value {
        Value::Object(root) => root,
        _ => return Err(DiagflowError::Validation(vec!["Workflow file must contain a JSON object".into()])),
    };

    let mut nodes = Vec::new();
    if let Some(Value::Array(raw_nodes)) = root.remove("nodes") {
        for mut raw in raw_nodes {
            let id = raw.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
            let node_type = match raw.get("type").and_then(Value::as_str) {
                Some(tag) => NodeType::from_str(tag).map_err(|_| DiagflowError::Node(format!("node {} has unknown type {}", id, tag)))?,
                None => NodeType::Question,
            };
            let position = Position::new(
                raw.pointer("/position/x").and_then(Value::as_f64).unwrap_or_default(),
                raw.pointer("/position/y").and_then(Value::as_f64).unwrap_or_default(),
            );
            let data = raw.get_mut("data").map(Value::take).unwrap_or(Value::Null);
            let kind = NodeKind::from_data(node_type, data)?;
            nodes.push(WorkflowNode::new(id, position, kind));
        }
    }

    let edges: Vec<WorkflowEdge> = match root.remove("edges") {
        Some(edges) => serde_json::from_value(edges).map_err(|e| DiagflowError::Edge(format!("invalid edge: {}", e)))?,
        None => Vec::new(),
    };

    let node_counter = root.get("nodeCounter").and_then(Value::as_u64).unwrap_or_else(|| derive_node_counter(&nodes));
    let text = |key: &str| root.get(key).and_then(Value::as_str).map(str::to_string);

    Ok(WorkflowDocument {
        name: text("name"),
        folder: text("folder"),
        appliance: text("appliance"),
        nodes,
        edges,
        node_counter,
    })
}

/// Validates and converts an already-parsed payload.
pub fn import_value(
    value: Value,
    limits: &ImportLimits,
) -> Result<ImportedDocument> {
    let report = validate_document(&value, limits);
    if !report.is_valid {
        debug!("import rejected: {:?}", report.errors);
        return Err(DiagflowError::Validation(report.errors));
    }

    let document = convert(value)?;
    info!("imported workflow with {} nodes and {} edges ({} warnings)", document.nodes.len(), document.edges.len(), report.warnings.len());
    Ok(ImportedDocument {
        document,
        warnings: report.warnings,
    })
}

/// Parses, validates and converts import text.
pub fn import_document(
    text: &str,
    limits: &ImportLimits,
) -> Result<ImportedDocument> {
    import_value(parse_json(text)?, limits)
}

/// Reads and imports a workflow file.
pub fn import_file<T: AsRef<Path>>(
    path: T,
    limits: &ImportLimits,
) -> Result<ImportedDocument> {
    let text = std::fs::read_to_string(path.as_ref())?;
    import_document(&text, limits)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::exchange::export_document;
    use crate::model::{ChoiceData, ChoiceOption, NodeType, QuestionData};

    fn valid() -> Value {
        json!({
            "nodes": [
                { "id": "node_1", "type": "question", "position": { "x": 0, "y": 0 }, "data": { "title": "Does the drum spin?" } },
                { "id": "node_2", "type": "result", "position": { "x": 0, "y": 120 }, "data": { "title": "Replace belt" } }
            ],
            "edges": [ { "id": "e1", "source": "node_1", "target": "node_2" } ],
            "nodeCounter": 2,
            "name": "Dryer",
            "folder": "Laundry"
        })
    }

    fn validate(value: &Value) -> ImportReport {
        validate_document(value, &ImportLimits::default())
    }

    fn sample_document() -> WorkflowDocument {
        WorkflowDocument {
            nodes: vec![
                WorkflowNode::new(
                    "node_1",
                    Position::new(12.5, -4.0),
                    NodeKind::Question(QuestionData {
                        title: "Is there water in the tub?".into(),
                        content: "Check after the cycle ends".into(),
                        help_text: Some("Look under the filter cap".into()),
                    }),
                ),
                WorkflowNode::new(
                    "node_2",
                    Position::new(0.0, 200.0),
                    NodeKind::Choice(ChoiceData {
                        title: "Drain hose state".into(),
                        content: String::new(),
                        options: vec![
                            ChoiceOption {
                                label: "Kinked".into(),
                                value: "kinked".into(),
                            },
                            ChoiceOption {
                                label: "Clear".into(),
                                value: "clear".into(),
                            },
                        ],
                    }),
                ),
                WorkflowNode::new("node_3", Position::new(0.0, 400.0), NodeType::DataForm.default_kind()),
            ],
            edges: vec![WorkflowEdge::new("e1", "node_1", "node_2").with_label("yes"), WorkflowEdge::new("e2", "node_2", "node_3")],
            node_counter: 3,
            name: Some("Washer won't drain".into()),
            folder: Some("Laundry".into()),
            appliance: Some("washer".into()),
        }
    }

    #[test]
    fn test_export_then_import_round_trips() {
        let doc = sample_document();
        let text = export_document(&doc).unwrap();
        let imported = import_document(&text, &ImportLimits::default()).unwrap();
        assert_eq!(imported.document, doc);
        assert!(imported.warnings.is_empty());
    }

    #[test]
    fn test_valid_payload() {
        let report = validate(&valid());
        assert!(report.is_valid, "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = import_document("{ nodes: [", &ImportLimits::default()).unwrap_err();
        assert!(matches!(err, DiagflowError::Parse(_)));
    }

    #[test]
    fn test_missing_nodes_or_edges() {
        let report = validate(&json!({ "edges": [] }));
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("'nodes'")));

        let report = validate(&json!({ "nodes": [] }));
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("'edges'")));

        let report = validate(&json!({ "nodes": {}, "edges": "none" }));
        assert_eq!(report.errors.len(), 2);

        let report = validate(&json!([1, 2]));
        assert!(!report.is_valid);
    }

    #[test]
    fn test_script_anywhere_is_rejected() {
        let mut value = valid();
        value["nodes"][1]["data"]["content"] = json!("<script>alert(1)</script>");
        let report = validate(&value);
        assert!(!report.is_valid);
        assert!(report.errors[0].contains("unsafe"));

        let mut value = valid();
        value["folder"] = json!("<SCRIPT src=x>");
        assert!(!validate(&value).is_valid);

        let mut value = valid();
        value["nodes"][0]["data"]["helpText"] = json!("JavaScript:void(0)");
        assert!(!validate(&value).is_valid);

        let err = import_value(json!({ "nodes": [], "edges": [], "x": "<script>" }), &ImportLimits::default()).unwrap_err();
        assert!(matches!(err, DiagflowError::Validation(_)));
    }

    #[test]
    fn test_escaped_script_is_rejected() {
        let text = r#"{ "nodes": [], "edges": [], "name": "<script>" }"#;
        assert!(matches!(import_document(text, &ImportLimits::default()), Err(DiagflowError::Validation(_))));
    }

    #[test]
    fn test_node_rules() {
        let value = json!({
            "nodes": [
                { "type": "question", "position": { "x": 0, "y": 0 } },
                { "id": "a", "position": { "x": 0, "y": 0 }, "data": {} },
                { "id": "b", "type": "question", "position": { "x": "0", "y": 0 }, "data": {} },
                { "id": "c", "type": "sql-query", "position": { "x": 0, "y": 0 }, "data": {} },
                { "id": "d", "type": "timed-step", "position": { "x": 0, "y": 0 } },
                { "id": "a", "type": "result", "position": { "x": 0, "y": 0 }, "data": {} },
                { "id": "e", "type": "timed-step", "position": { "x": 0, "y": 0 }, "data": { "durationSeconds": "soon" } }
            ],
            "edges": [],
            "nodeCounter": 5
        });
        let report = validate(&value);
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("index 0 is missing an id")));
        assert!(report.errors.iter().any(|e| e.contains("'b' is missing a valid position")));
        assert!(report.errors.iter().any(|e| e.contains("unknown type 'sql-query'")));
        assert!(report.errors.iter().any(|e| e.contains("Duplicate node id 'a'")));
        assert!(report.errors.iter().any(|e| e.contains("'e' has invalid timed-step data")));
        assert!(report.warnings.iter().any(|w| w.contains("'a' has no type")));
        assert!(report.warnings.iter().any(|w| w.contains("'d' has no data")));
    }

    #[test]
    fn test_edge_rules() {
        let mut value = valid();
        value["edges"] = json!([
            { "source": "node_1", "target": "node_2" },
            { "id": "e2", "target": "node_2" },
            { "id": "e3", "source": "node_1", "target": "node_9" }
        ]);
        let report = validate(&value);
        assert!(report.errors.contains(&"Edge at index 0 is missing id".to_string()));
        assert!(report.errors.contains(&"Edge 'e2' is missing source".to_string()));
        assert!(report.errors.contains(&"Edge 'e3' references unknown target node 'node_9'".to_string()));
    }

    #[test]
    fn test_size_policy_warns_only() {
        let nodes: Vec<Value> = (0..5).map(|i| json!({ "id": format!("n{}", i), "type": "question", "position": { "x": 0, "y": 0 }, "data": {} })).collect();
        let value = json!({ "nodes": nodes, "edges": [], "nodeCounter": 5 });
        let limits = ImportLimits {
            max_bytes: 64,
            max_nodes: 5,
        };
        let report = validate_document(&value, &limits);
        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_missing_counter_is_derived() {
        let mut value = valid();
        value.as_object_mut().unwrap().remove("nodeCounter");
        value["nodes"][1]["id"] = json!("node_14");
        value["edges"][0]["target"] = json!("node_14");
        let imported = import_value(value, &ImportLimits::default()).unwrap();
        assert_eq!(imported.document.node_counter, 14);
        assert_eq!(imported.warnings.len(), 1);
    }

    #[test]
    fn test_untyped_node_imports_as_question() {
        let mut value = valid();
        value["nodes"][0].as_object_mut().unwrap().remove("type");
        let imported = import_value(value, &ImportLimits::default()).unwrap();
        assert_eq!(imported.document.nodes[0].node_type(), NodeType::Question);
        assert_eq!(imported.document.nodes[0].title(), "Does the drum spin?");
        assert_eq!(imported.document.name.as_deref(), Some("Dryer"));
    }

    #[test]
    fn test_valid_report_means_import_succeeds() {
        let limits = ImportLimits::default();
        let node = |data: Value| json!({ "id": "a", "type": "timed-step", "position": { "x": 0, "y": 0 }, "data": data });
        let payloads = [
            json!({ "nodes": [node(json!({ "durationSeconds": 30.0 }))], "edges": [] }),
            json!({ "nodes": [node(json!({ "durationSeconds": 30 }))], "edges": [] }),
            json!({
                "nodes": [node(json!({})), { "id": "b", "type": "photo-capture", "position": { "x": 0, "y": 0 }, "data": { "requiredPhotos": 4294967296u64 } }],
                "edges": []
            }),
            json!({
                "nodes": [node(json!({})), { "id": "b", "type": "result", "position": { "x": 0, "y": 0 }, "data": {} }],
                "edges": [{ "id": "e1", "source": "a", "target": "b", "label": 5 }]
            }),
            json!({
                "nodes": [node(json!({})), { "id": "b", "type": "result", "position": { "x": 0, "y": 0 }, "data": {} }],
                "edges": [{ "id": "e1", "source": "a", "target": "b", "label": null, "type": ["smoothstep"] }]
            }),
            json!({
                "nodes": [node(json!({})), { "id": "b", "type": "result", "position": { "x": 0, "y": 0 }, "data": {} }],
                "edges": [{ "id": "e1", "source": "a", "target": "b", "label": "yes", "type": null }]
            }),
        ];

        for payload in payloads {
            let report = validate_document(&payload, &limits);
            let imported = import_value(payload.clone(), &limits);
            assert_eq!(report.is_valid, imported.is_ok(), "{} -> {:?} / {:?}", payload, report.errors, imported);
            if let Err(err) = imported {
                assert!(matches!(err, DiagflowError::Validation(_)), "{:?}", err);
            }
        }

        let report = validate_document(&json!({ "nodes": [node(json!({ "durationSeconds": 30.0 }))], "edges": [] }), &limits);
        assert!(report.errors.iter().any(|e| e.contains("'a' has unusable timed-step data")));
    }

    #[test]
    fn test_null_data_imports_with_defaults() {
        let value = json!({
            "nodes": [{ "id": "a", "type": "question", "position": { "x": 0, "y": 0 }, "data": null }],
            "edges": [],
            "nodeCounter": 1
        });
        let report = validate(&value);
        assert!(report.is_valid, "{:?}", report.errors);
        assert!(report.warnings.iter().any(|w| w.contains("'a' has no data")));

        let imported = import_value(value, &ImportLimits::default()).unwrap();
        assert_eq!(imported.document.nodes[0].kind, NodeType::Question.default_kind());
    }

    #[test]
    fn test_exhausted_counter_does_not_panic_editor() {
        let value = json!({ "nodes": [], "edges": [], "nodeCounter": u64::MAX });
        let imported = import_value(value, &ImportLimits::default()).unwrap();
        let mut graph = crate::workflow::WorkflowGraph::from_document(imported.document);
        assert!(matches!(graph.add_node(NodeType::Question.default_kind(), Position::default()), Err(DiagflowError::Workflow(_))));
    }
}
