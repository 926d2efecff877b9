use serde::{Deserialize, Serialize};

use crate::model::NodeId;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Grouping of results in the panel, derived from the rule id.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Structure,
    Content,
    Logic,
    Accessibility,
    Other,
}

impl Category {
    /// First category name found as a substring of `rule_id`.
    pub fn from_rule_id(rule_id: &str) -> Self {
        let rule_id = rule_id.to_lowercase();
        [Category::Structure, Category::Content, Category::Logic, Category::Accessibility]
            .into_iter()
            .find(|c| rule_id.contains(c.as_ref()))
            .unwrap_or(Category::Other)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationResult {
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            message: message.into(),
            node_id: None,
            suggestion: None,
        }
    }

    pub fn node(
        mut self,
        node_id: impl Into<NodeId>,
    ) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn suggest(
        mut self,
        suggestion: impl Into<String>,
    ) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn category(&self) -> Category {
        Category::from_rule_id(&self.rule_id)
    }

    /// Errors and warnings count as issues; info results do not.
    pub fn is_issue(&self) -> bool {
        self.severity != Severity::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_rule_id() {
        assert_eq!(Category::from_rule_id("structure.orphan-node"), Category::Structure);
        assert_eq!(Category::from_rule_id("Content-Missing-Title"), Category::Content);
        assert_eq!(Category::from_rule_id("logic.cycle"), Category::Logic);
        assert_eq!(Category::from_rule_id("accessibility.long-title"), Category::Accessibility);
        assert_eq!(Category::from_rule_id("custom.rule"), Category::Other);
    }

    #[test]
    fn test_serialize() {
        let result = ValidationResult::new("logic.cycle", Severity::Warning, "loop").node("node_2");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["ruleId"], "logic.cycle");
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["nodeId"], "node_2");
        assert!(value.get("suggestion").is_none());
    }
}
