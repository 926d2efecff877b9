use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    model::SavedWorkflow,
    search::{ComplexityBucket, DateRange, NodeCountBucket},
};

/// Search criteria over saved workflows. Unset criteria match everything;
/// set criteria are ANDed.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkflowFilter {
    pub text: Option<String>,
    pub category: Option<String>,
    pub date_range: Option<DateRange>,
    pub author: Option<String>,
    pub tags: Vec<String>,
    pub node_count: Option<NodeCountBucket>,
    pub complexity: Option<ComplexityBucket>,
}

fn eq_ignore_case(
    a: &str,
    b: &str,
) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl WorkflowFilter {
    pub fn text(
        mut self,
        text: impl Into<String>,
    ) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn category(
        mut self,
        category: impl Into<String>,
    ) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn date_range(
        mut self,
        range: DateRange,
    ) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn author(
        mut self,
        author: impl Into<String>,
    ) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn tag(
        mut self,
        tag: impl Into<String>,
    ) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn node_count(
        mut self,
        bucket: NodeCountBucket,
    ) -> Self {
        self.node_count = Some(bucket);
        self
    }

    pub fn complexity(
        mut self,
        bucket: ComplexityBucket,
    ) -> Self {
        self.complexity = Some(bucket);
        self
    }

    pub fn is_empty(&self) -> bool {
        non_blank(&self.text).is_none()
            && non_blank(&self.category).is_none()
            && self.date_range.is_none()
            && non_blank(&self.author).is_none()
            && self.tags.is_empty()
            && self.node_count.is_none()
            && self.complexity.is_none()
    }

    pub fn matches(
        &self,
        workflow: &SavedWorkflow,
        now: DateTime<Utc>,
    ) -> bool {
        let meta = &workflow.metadata;

        if let Some(text) = non_blank(&self.text) {
            let needle = text.to_lowercase();
            let hit = |s: &str| s.to_lowercase().contains(&needle);
            let found = hit(&meta.name)
                || hit(&meta.description)
                || meta.folder.as_deref().is_some_and(hit)
                || workflow.nodes.iter().any(|n| hit(n.title()) || hit(n.content()));
            if !found {
                return false;
            }
        }

        if let Some(category) = non_blank(&self.category) {
            let in_folder = meta.folder.as_deref().is_some_and(|f| eq_ignore_case(f, category));
            let in_appliance = meta.appliance.as_deref().is_some_and(|a| eq_ignore_case(a, category));
            if !in_folder && !in_appliance {
                return false;
            }
        }

        if let Some(range) = self.date_range {
            if !range.contains(meta.updated_at, now) {
                return false;
            }
        }

        if let Some(author) = non_blank(&self.author) {
            if !meta.author.as_deref().is_some_and(|a| eq_ignore_case(a, author)) {
                return false;
            }
        }

        if !self.tags.iter().all(|tag| meta.tags.contains(tag)) {
            return false;
        }

        if let Some(bucket) = self.node_count {
            if NodeCountBucket::from_count(workflow.nodes.len()) != bucket {
                return false;
            }
        }

        if let Some(bucket) = self.complexity {
            if ComplexityBucket::of(workflow) != bucket {
                return false;
            }
        }

        true
    }
}

/// Workflows matching `filter`, in input order.
pub fn filter_workflows<'a>(
    workflows: &'a [SavedWorkflow],
    filter: &WorkflowFilter,
    now: DateTime<Utc>,
) -> Vec<&'a SavedWorkflow> {
    workflows.iter().filter(|w| filter.matches(w, now)).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::model::{NodeKind, NodeType, Position, QuestionData, WorkflowEdge, WorkflowNode};

    fn workflow(
        name: &str,
        nodes: usize,
    ) -> SavedWorkflow {
        let mut wf = SavedWorkflow::new(name);
        for i in 1..=nodes {
            wf.nodes.push(WorkflowNode::new(format!("node_{}", i), Position::default(), NodeType::Question.default_kind()));
        }
        wf.node_counter = nodes as u64;
        wf
    }

    fn titled(
        name: &str,
        title: &str,
        content: &str,
    ) -> SavedWorkflow {
        let mut wf = workflow(name, 0);
        wf.nodes.push(WorkflowNode::new(
            "node_1",
            Position::default(),
            NodeKind::Question(QuestionData {
                title: title.into(),
                content: content.into(),
                help_text: None,
            }),
        ));
        wf
    }

    #[test]
    fn test_text_search_fields() {
        let now = Utc::now();
        let mut by_description = workflow("A", 1);
        by_description.metadata.description = "Replace the drain PUMP".into();
        let mut by_folder = workflow("B", 1);
        by_folder.metadata.folder = Some("Pumps".into());
        let mut by_tag_only = workflow("C", 1);
        by_tag_only.metadata.tags = vec!["pump".into()];
        let mut by_appliance_only = workflow("D", 1);
        by_appliance_only.metadata.appliance = Some("pump".into());

        let list = vec![
            workflow("Pump noise", 1),
            by_description,
            by_folder,
            titled("E", "Check the pump", ""),
            titled("F", "Inspect", "listen to the pump motor"),
            by_tag_only,
            by_appliance_only,
            workflow("Door latch", 1),
        ];
        let names: Vec<&str> = filter_workflows(&list, &WorkflowFilter::default().text("pump"), now).iter().map(|w| w.name()).collect();
        assert_eq!(names, vec!["Pump noise", "A", "B", "E", "F"]);
    }

    #[test]
    fn test_category_author_tags() {
        let now = Utc::now();
        let mut wf = workflow("Fridge", 2);
        wf.metadata.folder = Some("Refrigeration".into());
        wf.metadata.appliance = Some("Side-by-side".into());
        wf.metadata.author = Some("Sam Ortiz".into());
        wf.metadata.tags = vec!["cooling".into(), "compressor".into()];

        assert!(WorkflowFilter::default().category("refrigeration").matches(&wf, now));
        assert!(WorkflowFilter::default().category("SIDE-BY-SIDE").matches(&wf, now));
        assert!(!WorkflowFilter::default().category("Refrig").matches(&wf, now));
        assert!(WorkflowFilter::default().author("sam ortiz").matches(&wf, now));
        assert!(!WorkflowFilter::default().author("sam").matches(&wf, now));
        assert!(WorkflowFilter::default().tag("cooling").tag("compressor").matches(&wf, now));
        assert!(!WorkflowFilter::default().tag("cooling").tag("ice").matches(&wf, now));
        assert!(!WorkflowFilter::default().category("refrigeration").author("lee").matches(&wf, now));
    }

    #[test]
    fn test_node_count_bucket_boundary() {
        let now = Utc::now();
        let list = vec![workflow("five", 5), workflow("six", 6)];
        let small = filter_workflows(&list, &WorkflowFilter::default().node_count(NodeCountBucket::Small), now);
        assert_eq!(small.len(), 1);
        assert_eq!(small[0].name(), "five");
    }

    #[test]
    fn test_complexity_filter() {
        let now = Utc::now();
        let mut wf = workflow("big", 8);
        wf.nodes.push(WorkflowNode::new("node_9", Position::default(), NodeType::DataForm.default_kind()));
        wf.nodes.push(WorkflowNode::new("node_10", Position::default(), NodeType::PhotoCapture.default_kind()));
        for i in 1..=9 {
            wf.edges.push(WorkflowEdge::new(format!("e{}", i), format!("node_{}", i), format!("node_{}", i + 1)));
        }
        wf.edges.push(WorkflowEdge::new("e10", "node_10", "node_1"));

        assert!(WorkflowFilter::default().complexity(ComplexityBucket::Complex).matches(&wf, now));
        assert!(!WorkflowFilter::default().complexity(ComplexityBucket::Simple).matches(&workflow("tiny", 10), now));
    }

    #[test]
    fn test_date_range_uses_updated_at() {
        let now = Utc::now();
        let mut old = workflow("old", 1);
        old.metadata.updated_at = now - Duration::days(10);
        let fresh = workflow("fresh", 1);

        let list = vec![old, fresh];
        let week = filter_workflows(&list, &WorkflowFilter::default().date_range(DateRange::Week), now);
        assert_eq!(week.len(), 1);
        assert_eq!(week[0].name(), "fresh");
        assert_eq!(filter_workflows(&list, &WorkflowFilter::default().date_range(DateRange::Month), now).len(), 2);
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let filter = WorkflowFilter::default().text("  ");
        assert!(filter.is_empty());
        assert!(filter.matches(&workflow("x", 0), Utc::now()));
    }
}
