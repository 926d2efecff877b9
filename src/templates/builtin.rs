use std::sync::LazyLock;

use crate::model::{
    ChoiceData, ChoiceOption, Difficulty, EquipmentTestData, HazardLevel, NodeKind, Position, ProcedureStepData, QuestionData, ResistanceCheckData,
    ResultData, SafetyWarningData, TimedStepData, VoltageCheckData, WorkflowEdge, WorkflowNode, WorkflowTemplate,
};

static BUILTIN_TEMPLATES: LazyLock<Vec<WorkflowTemplate>> = LazyLock::new(|| {
    vec![
        washer_no_drain(),
        refrigerator_not_cooling(),
        dryer_no_heat(),
        dishwasher_leak(),
    ]
});

/// Templates shipped with the library.
pub fn builtin_templates() -> &'static [WorkflowTemplate] {
    &BUILTIN_TEMPLATES
}

fn node(
    id: &str,
    y: f64,
    kind: NodeKind,
) -> WorkflowNode {
    WorkflowNode::new(id, Position::new(250.0, y), kind)
}

fn question(
    title: &str,
    content: &str,
) -> NodeKind {
    NodeKind::Question(QuestionData {
        title: title.into(),
        content: content.into(),
        help_text: None,
    })
}

fn yes_no(title: &str) -> NodeKind {
    NodeKind::Choice(ChoiceData {
        title: title.into(),
        content: String::new(),
        options: vec![
            ChoiceOption {
                label: "Yes".into(),
                value: "yes".into(),
            },
            ChoiceOption {
                label: "No".into(),
                value: "no".into(),
            },
        ],
    })
}

fn result(
    title: &str,
    resolution: &str,
    parts: &[&str],
) -> NodeKind {
    NodeKind::Result(ResultData {
        title: title.into(),
        content: String::new(),
        resolution: Some(resolution.into()),
        parts_needed: parts.iter().map(|p| p.to_string()).collect(),
    })
}

fn safety(
    title: &str,
    level: HazardLevel,
    precautions: &[&str],
) -> NodeKind {
    NodeKind::SafetyWarning(SafetyWarningData {
        title: title.into(),
        content: String::new(),
        hazard_level: level,
        precautions: precautions.iter().map(|p| p.to_string()).collect(),
    })
}

fn edge(
    source: &str,
    target: &str,
) -> WorkflowEdge {
    WorkflowEdge::new(format!("edge_{}_{}", source, target), source, target)
}

#[allow(clippy::too_many_arguments)]
fn template(
    id: &str,
    name: &str,
    description: &str,
    category: &str,
    difficulty: Difficulty,
    estimated_time: &str,
    tags: &[&str],
    nodes: Vec<WorkflowNode>,
    edges: Vec<WorkflowEdge>,
) -> WorkflowTemplate {
    WorkflowTemplate {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        category: category.into(),
        difficulty,
        estimated_time: estimated_time.into(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        is_public: true,
        is_builtin: true,
        author: None,
        created_at: None,
        node_counter: nodes.len() as u64,
        nodes,
        edges,
    }
}

fn washer_no_drain() -> WorkflowTemplate {
    template(
        "builtin_washer_no_drain",
        "Washer won't drain",
        "Standing water after the cycle: hose, filter and drain pump checks",
        "Laundry",
        Difficulty::Beginner,
        "20-30 min",
        &["washer", "drain", "pump"],
        vec![
            node("node_1", 0.0, safety("Disconnect power", HazardLevel::High, &["Unplug the washer", "Towel down the floor before opening the filter"])),
            node("node_2", 120.0, yes_no("Is the drain hose kinked or clogged?")),
            node("node_3", 240.0, result("Clear the drain hose", "Straighten or flush the hose and rerun a drain cycle", &[])),
            node("node_4", 240.0, question("Inspect the pump filter", "Remove the filter cap and clear lint, coins and debris")),
            node(
                "node_5",
                360.0,
                NodeKind::ResistanceCheck(ResistanceCheckData {
                    title: "Measure drain pump winding".into(),
                    content: "Probe the pump terminals with the harness disconnected".into(),
                    test_points: vec!["Pump terminal 1".into(), "Pump terminal 2".into()],
                    expected_ohms: Some(15.0),
                    tolerance_percent: Some(20.0),
                }),
            ),
            node("node_6", 480.0, result("Replace drain pump", "Install a new drain pump assembly", &["Drain pump"])),
        ],
        vec![edge("node_1", "node_2"), edge("node_2", "node_3"), edge("node_2", "node_4"), edge("node_4", "node_5"), edge("node_5", "node_6")],
    )
}

fn refrigerator_not_cooling() -> WorkflowTemplate {
    template(
        "builtin_refrigerator_not_cooling",
        "Refrigerator not cooling",
        "Fresh food section warm: airflow, condenser and compressor start checks",
        "Refrigeration",
        Difficulty::Intermediate,
        "45-60 min",
        &["refrigerator", "cooling", "compressor"],
        vec![
            node("node_1", 0.0, question("Check thermostat setting", "Confirm the control is set to the recommended temperature")),
            node(
                "node_2",
                120.0,
                NodeKind::ProcedureStep(ProcedureStepData {
                    title: "Clean condenser coils".into(),
                    content: String::new(),
                    steps: vec!["Pull the unit from the wall".into(), "Vacuum the coils and fan grille".into()],
                    tools: vec!["Coil brush".into(), "Vacuum".into()],
                }),
            ),
            node(
                "node_3",
                240.0,
                NodeKind::TimedStep(TimedStepData {
                    title: "Let the system stabilize".into(),
                    content: "Run with doors closed before measuring".into(),
                    duration_seconds: 900,
                }),
            ),
            node(
                "node_4",
                360.0,
                NodeKind::VoltageCheck(VoltageCheckData {
                    title: "Check compressor supply".into(),
                    content: String::new(),
                    test_points: vec!["Start relay L".into(), "Start relay N".into()],
                    min_volts: Some(108.0),
                    max_volts: Some(132.0),
                    ..Default::default()
                }),
            ),
            node("node_5", 480.0, result("Replace start relay", "Fit a new start relay and overload", &["Start relay", "Overload protector"])),
        ],
        vec![edge("node_1", "node_2"), edge("node_2", "node_3"), edge("node_3", "node_4"), edge("node_4", "node_5")],
    )
}

fn dryer_no_heat() -> WorkflowTemplate {
    template(
        "builtin_dryer_no_heat",
        "Dryer runs but no heat",
        "Drum turns but clothes stay damp: vent, thermal fuse and element checks",
        "Laundry",
        Difficulty::Intermediate,
        "30-45 min",
        &["dryer", "heating", "thermal fuse"],
        vec![
            node("node_1", 0.0, safety("240V circuit", HazardLevel::Critical, &["Switch off the breaker", "Verify zero voltage before touching terminals"])),
            node("node_2", 120.0, yes_no("Is the exhaust vent clear?")),
            node(
                "node_3",
                240.0,
                NodeKind::EquipmentTest(EquipmentTestData {
                    title: "Thermal fuse continuity".into(),
                    content: String::new(),
                    equipment: "Multimeter".into(),
                    procedure: "Set to continuity and probe both fuse terminals".into(),
                    expected_value: Some("continuity".into()),
                    unit: None,
                    tolerance: None,
                }),
            ),
            node("node_4", 360.0, result("Replace thermal fuse", "Replace the fuse and clean the vent run", &["Thermal fuse"])),
        ],
        vec![edge("node_1", "node_2"), edge("node_2", "node_3"), edge("node_3", "node_4")],
    )
}

fn dishwasher_leak() -> WorkflowTemplate {
    template(
        "builtin_dishwasher_leak",
        "Dishwasher leaking",
        "Water on the floor during a cycle: door gasket, spray arm and hose clamps",
        "Dishwashers",
        Difficulty::Beginner,
        "15-25 min",
        &["dishwasher", "leak"],
        vec![
            node("node_1", 0.0, question("Where does the water appear?", "Front of the door, underneath or at the back")),
            node("node_2", 120.0, yes_no("Is the door gasket torn or loose?")),
            node("node_3", 240.0, result("Replace door gasket", "Seat a new gasket starting at the top center", &["Door gasket"])),
            node("node_4", 240.0, result("Tighten hose clamps", "Tighten or replace the inlet and drain hose clamps", &["Hose clamp"])),
        ],
        vec![edge("node_1", "node_2"), edge("node_2", "node_3"), edge("node_2", "node_4")],
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::workflow::WorkflowGraph;

    #[test]
    fn test_builtins_are_well_formed() {
        let templates = builtin_templates();
        let ids: HashSet<&str> = templates.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), templates.len());

        for tpl in templates {
            assert!(tpl.is_builtin);
            let graph = WorkflowGraph::from_document(tpl.to_document());
            for e in &tpl.edges {
                assert!(graph.contains_node(&e.source), "{} in {}", e.source, tpl.id);
                assert!(graph.contains_node(&e.target), "{} in {}", e.target, tpl.id);
            }
        }
    }
}
