use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    DiagflowError, Result,
    model::NodeId,
    validation::{Category, Severity, ValidationResult, lint},
    workflow::WorkflowGraph,
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PanelState {
    #[default]
    Idle,
    Validating,
    Valid,
    HasIssues,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.info
    }
}

/// Presents lint results: a run state plus filtering, grouping and per-node drill-down.
#[derive(Debug, Clone, Default)]
pub struct ValidationPanel {
    state: PanelState,
    results: Vec<ValidationResult>,
    severity_filter: Option<Severity>,
    selected_node: Option<NodeId>,
    last_run: Option<DateTime<Utc>>,
}

impl ValidationPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }

    /// Enters `Validating`. Allowed from any state; previous results stay visible until completion.
    pub fn begin(&mut self) {
        self.state = PanelState::Validating;
    }

    /// Publishes results of the run started by [`begin`](Self::begin).
    pub fn complete(
        &mut self,
        results: Vec<ValidationResult>,
    ) -> Result<()> {
        if self.state != PanelState::Validating {
            return Err(DiagflowError::Workflow(format!("cannot complete validation in state {}", self.state.as_ref())));
        }
        self.publish(results);
        Ok(())
    }

    /// Lints `graph` and publishes the results.
    pub fn run(
        &mut self,
        graph: &WorkflowGraph,
    ) -> &[ValidationResult] {
        self.begin();
        self.publish(lint(graph));
        &self.results
    }

    /// Back to `Idle` with no results.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn publish(
        &mut self,
        results: Vec<ValidationResult>,
    ) {
        self.state = if results.iter().any(ValidationResult::is_issue) { PanelState::HasIssues } else { PanelState::Valid };
        self.results = results;
        self.last_run = Some(Utc::now());
        let stale = self.selected_node.as_ref().is_some_and(|node| !self.results.iter().any(|r| r.node_id.as_ref() == Some(node)));
        if stale {
            self.selected_node = None;
        }
        debug!("validation finished: {}, {} results", self.state.as_ref(), self.results.len());
    }

    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    pub fn set_severity_filter(
        &mut self,
        severity: Option<Severity>,
    ) {
        self.severity_filter = severity;
    }

    pub fn severity_filter(&self) -> Option<Severity> {
        self.severity_filter
    }

    /// Results passing the severity filter.
    pub fn visible(&self) -> Vec<&ValidationResult> {
        self.results.iter().filter(|r| self.severity_filter.is_none_or(|s| r.severity == s)).collect()
    }

    /// Visible results grouped by category.
    pub fn by_category(&self) -> BTreeMap<Category, Vec<&ValidationResult>> {
        let mut groups: BTreeMap<Category, Vec<&ValidationResult>> = BTreeMap::new();
        for result in self.visible() {
            groups.entry(result.category()).or_default().push(result);
        }
        groups
    }

    /// Counts over all results, ignoring the severity filter.
    pub fn counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for result in &self.results {
            match result.severity {
                Severity::Error => counts.errors += 1,
                Severity::Warning => counts.warnings += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }

    pub fn select_node(
        &mut self,
        node_id: Option<NodeId>,
    ) {
        self.selected_node = node_id;
    }

    pub fn selected_node(&self) -> Option<&str> {
        self.selected_node.as_deref()
    }

    pub fn issues_for(
        &self,
        node_id: &str,
    ) -> Vec<&ValidationResult> {
        self.results.iter().filter(|r| r.node_id.as_deref() == Some(node_id)).collect()
    }

    /// Results of the selected node; empty when nothing is selected.
    pub fn selected_issues(&self) -> Vec<&ValidationResult> {
        match &self.selected_node {
            Some(id) => self.issues_for(id),
            None => Vec::new(),
        }
    }
}
