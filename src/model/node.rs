//! Workflow node definitions.
//!
//! A node is an `id`, a canvas `position` and a [`NodeKind`] carrying the
//! payload of one diagnostic step. On the wire the kind is split into a
//! kebab-case `type` tag and a camelCase `data` object:
//!
//! ```json
//! { "id": "node_1", "type": "voltage-check", "position": { "x": 0, "y": 80 },
//!   "data": { "title": "Check supply", "minVolts": 110, "maxVolts": 125 } }
//! ```

use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};
use serde_json::{Value, json};

use crate::{DiagflowError, Result};

/// node id
pub type NodeId = String;

/// Canvas coordinate of a node. Overlapping nodes are allowed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(
        x: f64,
        y: f64,
    ) -> Self {
        Self {
            x,
            y,
        }
    }
}

/// Wire tag of a node kind.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString, strum::EnumIter, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum NodeType {
    #[default]
    Question,
    Choice,
    Result,
    EquipmentTest,
    PhotoCapture,
    ProcedureStep,
    DecisionTree,
    VoltageCheck,
    ResistanceCheck,
    DataForm,
    TimedStep,
    SafetyWarning,
}

impl NodeType {
    /// Node types carrying structured domain data beyond plain text.
    pub fn is_enhanced(&self) -> bool {
        matches!(self, NodeType::DecisionTree | NodeType::EquipmentTest | NodeType::DataForm | NodeType::PhotoCapture)
    }

    /// A kind of this type with an empty payload.
    pub fn default_kind(&self) -> NodeKind {
        match self {
            NodeType::Question => NodeKind::Question(QuestionData::default()),
            NodeType::Choice => NodeKind::Choice(ChoiceData::default()),
            NodeType::Result => NodeKind::Result(ResultData::default()),
            NodeType::EquipmentTest => NodeKind::EquipmentTest(EquipmentTestData::default()),
            NodeType::PhotoCapture => NodeKind::PhotoCapture(PhotoCaptureData::default()),
            NodeType::ProcedureStep => NodeKind::ProcedureStep(ProcedureStepData::default()),
            NodeType::DecisionTree => NodeKind::DecisionTree(DecisionTreeData::default()),
            NodeType::VoltageCheck => NodeKind::VoltageCheck(VoltageCheckData::default()),
            NodeType::ResistanceCheck => NodeKind::ResistanceCheck(ResistanceCheckData::default()),
            NodeType::DataForm => NodeKind::DataForm(DataFormData::default()),
            NodeType::TimedStep => NodeKind::TimedStep(TimedStepData::default()),
            NodeType::SafetyWarning => NodeKind::SafetyWarning(SafetyWarningData::default()),
        }
    }

    /// JSON schema of the `data` payload for this node type.
    pub fn schema(&self) -> Value {
        let string_list = json!({ "type": "array", "items": { "type": "string" } });
        let optional_number = json!({ "type": ["number", "null"] });
        let optional_string = json!({ "type": ["string", "null"] });

        let specific = match self {
            NodeType::Question => json!({ "helpText": optional_string }),
            NodeType::Choice => json!({
                "options": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "label": { "type": "string" }, "value": { "type": "string" } }
                    }
                }
            }),
            NodeType::Result => json!({ "resolution": optional_string, "partsNeeded": string_list }),
            NodeType::EquipmentTest => json!({
                "equipment": { "type": "string" },
                "procedure": { "type": "string" },
                "expectedValue": optional_string,
                "unit": optional_string,
                "tolerance": optional_string
            }),
            NodeType::PhotoCapture => json!({
                "instructions": { "type": "string" },
                "requiredPhotos": { "type": "integer", "minimum": 0, "maximum": u32::MAX }
            }),
            NodeType::ProcedureStep => json!({ "steps": string_list, "tools": string_list }),
            NodeType::DecisionTree => json!({
                "branches": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "condition": { "type": "string" }, "label": { "type": "string" } }
                    }
                }
            }),
            NodeType::VoltageCheck => json!({
                "testPoints": string_list,
                "minVolts": optional_number,
                "maxVolts": optional_number,
                "current": { "enum": ["ac", "dc"] }
            }),
            NodeType::ResistanceCheck => json!({
                "testPoints": string_list,
                "expectedOhms": optional_number,
                "tolerancePercent": optional_number
            }),
            NodeType::DataForm => json!({
                "fields": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "label": { "type": "string" },
                            "fieldType": { "enum": ["text", "number", "select", "checkbox", "date"] },
                            "required": { "type": "boolean" },
                            "options": string_list
                        }
                    }
                }
            }),
            NodeType::TimedStep => json!({ "durationSeconds": { "type": "integer", "minimum": 0, "maximum": u64::MAX } }),
            NodeType::SafetyWarning => json!({
                "hazardLevel": { "enum": ["low", "medium", "high", "critical"] },
                "precautions": string_list
            }),
        };

        let mut properties = json!({
            "title": { "type": "string" },
            "content": { "type": "string" }
        });
        if let (Some(base), Value::Object(extra)) = (properties.as_object_mut(), specific) {
            base.extend(extra);
        }

        json!({
            "type": "object",
            "properties": properties
        })
    }
}

/// Typed payload of a node, one variant per [`NodeType`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Question(QuestionData),
    Choice(ChoiceData),
    Result(ResultData),
    EquipmentTest(EquipmentTestData),
    PhotoCapture(PhotoCaptureData),
    ProcedureStep(ProcedureStepData),
    DecisionTree(DecisionTreeData),
    VoltageCheck(VoltageCheckData),
    ResistanceCheck(ResistanceCheckData),
    DataForm(DataFormData),
    TimedStep(TimedStepData),
    SafetyWarning(SafetyWarningData),
}

impl Default for NodeKind {
    fn default() -> Self {
        NodeType::default().default_kind()
    }
}

impl NodeKind {
    /// Builds a kind from its wire tag and `data` payload. A `null` payload yields defaults.
    pub fn from_data(
        node_type: NodeType,
        data: Value,
    ) -> Result<Self> {
        if data.is_null() {
            return Ok(node_type.default_kind());
        }

        fn payload<T: serde::de::DeserializeOwned>(
            node_type: NodeType,
            data: Value,
        ) -> Result<T> {
            serde_json::from_value(data).map_err(|e| DiagflowError::Node(format!("invalid {} data: {}", node_type, e)))
        }

        let kind = match node_type {
            NodeType::Question => NodeKind::Question(payload(node_type, data)?),
            NodeType::Choice => NodeKind::Choice(payload(node_type, data)?),
            NodeType::Result => NodeKind::Result(payload(node_type, data)?),
            NodeType::EquipmentTest => NodeKind::EquipmentTest(payload(node_type, data)?),
            NodeType::PhotoCapture => NodeKind::PhotoCapture(payload(node_type, data)?),
            NodeType::ProcedureStep => NodeKind::ProcedureStep(payload(node_type, data)?),
            NodeType::DecisionTree => NodeKind::DecisionTree(payload(node_type, data)?),
            NodeType::VoltageCheck => NodeKind::VoltageCheck(payload(node_type, data)?),
            NodeType::ResistanceCheck => NodeKind::ResistanceCheck(payload(node_type, data)?),
            NodeType::DataForm => NodeKind::DataForm(payload(node_type, data)?),
            NodeType::TimedStep => NodeKind::TimedStep(payload(node_type, data)?),
            NodeType::SafetyWarning => NodeKind::SafetyWarning(payload(node_type, data)?),
        };
        Ok(kind)
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Question(_) => NodeType::Question,
            NodeKind::Choice(_) => NodeType::Choice,
            NodeKind::Result(_) => NodeType::Result,
            NodeKind::EquipmentTest(_) => NodeType::EquipmentTest,
            NodeKind::PhotoCapture(_) => NodeType::PhotoCapture,
            NodeKind::ProcedureStep(_) => NodeType::ProcedureStep,
            NodeKind::DecisionTree(_) => NodeType::DecisionTree,
            NodeKind::VoltageCheck(_) => NodeType::VoltageCheck,
            NodeKind::ResistanceCheck(_) => NodeType::ResistanceCheck,
            NodeKind::DataForm(_) => NodeType::DataForm,
            NodeKind::TimedStep(_) => NodeType::TimedStep,
            NodeKind::SafetyWarning(_) => NodeType::SafetyWarning,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            NodeKind::Question(d) => &d.title,
            NodeKind::Choice(d) => &d.title,
            NodeKind::Result(d) => &d.title,
            NodeKind::EquipmentTest(d) => &d.title,
            NodeKind::PhotoCapture(d) => &d.title,
            NodeKind::ProcedureStep(d) => &d.title,
            NodeKind::DecisionTree(d) => &d.title,
            NodeKind::VoltageCheck(d) => &d.title,
            NodeKind::ResistanceCheck(d) => &d.title,
            NodeKind::DataForm(d) => &d.title,
            NodeKind::TimedStep(d) => &d.title,
            NodeKind::SafetyWarning(d) => &d.title,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            NodeKind::Question(d) => &d.content,
            NodeKind::Choice(d) => &d.content,
            NodeKind::Result(d) => &d.content,
            NodeKind::EquipmentTest(d) => &d.content,
            NodeKind::PhotoCapture(d) => &d.content,
            NodeKind::ProcedureStep(d) => &d.content,
            NodeKind::DecisionTree(d) => &d.content,
            NodeKind::VoltageCheck(d) => &d.content,
            NodeKind::ResistanceCheck(d) => &d.content,
            NodeKind::DataForm(d) => &d.content,
            NodeKind::TimedStep(d) => &d.content,
            NodeKind::SafetyWarning(d) => &d.content,
        }
    }

    pub fn set_title(
        &mut self,
        title: impl Into<String>,
    ) {
        let title = title.into();
        match self {
            NodeKind::Question(d) => d.title = title,
            NodeKind::Choice(d) => d.title = title,
            NodeKind::Result(d) => d.title = title,
            NodeKind::EquipmentTest(d) => d.title = title,
            NodeKind::PhotoCapture(d) => d.title = title,
            NodeKind::ProcedureStep(d) => d.title = title,
            NodeKind::DecisionTree(d) => d.title = title,
            NodeKind::VoltageCheck(d) => d.title = title,
            NodeKind::ResistanceCheck(d) => d.title = title,
            NodeKind::DataForm(d) => d.title = title,
            NodeKind::TimedStep(d) => d.title = title,
            NodeKind::SafetyWarning(d) => d.title = title,
        }
    }

    pub fn is_enhanced(&self) -> bool {
        self.node_type().is_enhanced()
    }
}

/// A single step of a diagnostic workflow.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(try_from = "RawNode")]
pub struct WorkflowNode {
    pub id: NodeId,
    pub position: Position,
    pub kind: NodeKind,
}

impl WorkflowNode {
    pub fn new(
        id: impl Into<NodeId>,
        position: Position,
        kind: NodeKind,
    ) -> Self {
        Self {
            id: id.into(),
            position,
            kind,
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn title(&self) -> &str {
        self.kind.title()
    }

    pub fn content(&self) -> &str {
        self.kind.content()
    }
}

#[derive(Deserialize)]
struct RawNode {
    id: NodeId,
    #[serde(rename = "type", default)]
    node_type: NodeType,
    #[serde(default)]
    position: Position,
    #[serde(default)]
    data: Value,
}

impl TryFrom<RawNode> for WorkflowNode {
    type Error = DiagflowError;

    fn try_from(raw: RawNode) -> Result<Self> {
        Ok(Self {
            kind: NodeKind::from_data(raw.node_type, raw.data)?,
            id: raw.id,
            position: raw.position,
        })
    }
}

impl Serialize for WorkflowNode {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("WorkflowNode", 4)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("type", &self.kind.node_type())?;
        state.serialize_field("position", &self.position)?;
        match &self.kind {
            NodeKind::Question(d) => state.serialize_field("data", d)?,
            NodeKind::Choice(d) => state.serialize_field("data", d)?,
            NodeKind::Result(d) => state.serialize_field("data", d)?,
            NodeKind::EquipmentTest(d) => state.serialize_field("data", d)?,
            NodeKind::PhotoCapture(d) => state.serialize_field("data", d)?,
            NodeKind::ProcedureStep(d) => state.serialize_field("data", d)?,
            NodeKind::DecisionTree(d) => state.serialize_field("data", d)?,
            NodeKind::VoltageCheck(d) => state.serialize_field("data", d)?,
            NodeKind::ResistanceCheck(d) => state.serialize_field("data", d)?,
            NodeKind::DataForm(d) => state.serialize_field("data", d)?,
            NodeKind::TimedStep(d) => state.serialize_field("data", d)?,
            NodeKind::SafetyWarning(d) => state.serialize_field("data", d)?,
        }
        state.end()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct QuestionData {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ChoiceOption {
    pub label: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ChoiceData {
    pub title: String,
    pub content: String,
    pub options: Vec<ChoiceOption>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ResultData {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    pub parts_needed: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EquipmentTestData {
    pub title: String,
    pub content: String,
    /// meter or tool used for the test
    pub equipment: String,
    pub procedure: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PhotoCaptureData {
    pub title: String,
    pub content: String,
    pub instructions: String,
    pub required_photos: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcedureStepData {
    pub title: String,
    pub content: String,
    pub steps: Vec<String>,
    pub tools: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DecisionBranch {
    pub condition: String,
    pub label: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DecisionTreeData {
    pub title: String,
    pub content: String,
    pub branches: Vec<DecisionBranch>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CurrentType {
    #[default]
    Ac,
    Dc,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct VoltageCheckData {
    pub title: String,
    pub content: String,
    pub test_points: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_volts: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_volts: Option<f64>,
    pub current: CurrentType,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ResistanceCheckData {
    pub title: String,
    pub content: String,
    pub test_points: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_ohms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance_percent: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FormFieldType {
    #[default]
    Text,
    Number,
    Select,
    Checkbox,
    Date,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub field_type: FormFieldType,
    pub required: bool,
    /// choices for `select` fields
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DataFormData {
    pub title: String,
    pub content: String,
    pub fields: Vec<FormField>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TimedStepData {
    pub title: String,
    pub content: String,
    pub duration_seconds: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HazardLevel {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SafetyWarningData {
    pub title: String,
    pub content: String,
    pub hazard_level: HazardLevel,
    pub precautions: Vec<String>,
}
