use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{model::SavedWorkflow, search::WorkflowFilter};

/// Distinct values present in a workflow list, for building filter controls.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    /// folders and appliances
    pub categories: Vec<String>,
}

impl Facets {
    pub fn collect(workflows: &[SavedWorkflow]) -> Self {
        let mut authors = BTreeSet::new();
        let mut tags = BTreeSet::new();
        let mut categories = BTreeSet::new();
        for wf in workflows {
            let meta = &wf.metadata;
            authors.extend(meta.author.iter().cloned());
            tags.extend(meta.tags.iter().cloned());
            categories.extend(meta.folder.iter().chain(meta.appliance.iter()).cloned());
        }
        Self {
            authors: authors.into_iter().collect(),
            tags: tags.into_iter().collect(),
            categories: categories.into_iter().collect(),
        }
    }
}

/// A workflow list with a filter applied.
///
/// The result set is rebuilt by a full scan whenever the list or the filter
/// changes. Without a fixed clock, date ranges are evaluated against the
/// current time at that moment.
#[derive(Debug, Clone, Default)]
pub struct SearchView {
    workflows: Vec<SavedWorkflow>,
    filter: WorkflowFilter,
    clock: Option<DateTime<Utc>>,
    matches: Vec<usize>,
}

impl SearchView {
    pub fn new(workflows: Vec<SavedWorkflow>) -> Self {
        let mut view = Self {
            workflows,
            ..Default::default()
        };
        view.refresh();
        view
    }

    /// Pins the reference time used by date-range filters.
    pub fn at(
        mut self,
        now: DateTime<Utc>,
    ) -> Self {
        self.clock = Some(now);
        self.refresh();
        self
    }

    pub fn filter(&self) -> &WorkflowFilter {
        &self.filter
    }

    pub fn workflows(&self) -> &[SavedWorkflow] {
        &self.workflows
    }

    pub fn set_filter(
        &mut self,
        filter: WorkflowFilter,
    ) {
        self.filter = filter;
        self.refresh();
    }

    pub fn clear_filter(&mut self) {
        self.set_filter(WorkflowFilter::default());
    }

    pub fn set_workflows(
        &mut self,
        workflows: Vec<SavedWorkflow>,
    ) {
        self.workflows = workflows;
        self.refresh();
    }

    pub fn results(&self) -> Vec<&SavedWorkflow> {
        self.matches.iter().filter_map(|&i| self.workflows.get(i)).collect()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Facets over the whole list, not only the current results.
    pub fn facets(&self) -> Facets {
        Facets::collect(&self.workflows)
    }

    fn refresh(&mut self) {
        let now = self.clock.unwrap_or_else(Utc::now);
        self.matches = self.workflows.iter().enumerate().filter(|(_, w)| self.filter.matches(w, now)).map(|(i, _)| i).collect();
        debug!("search matched {} of {} workflows", self.matches.len(), self.workflows.len());
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::search::DateRange;

    fn workflow(
        name: &str,
        folder: &str,
        author: Option<&str>,
        tags: &[&str],
    ) -> SavedWorkflow {
        let mut wf = SavedWorkflow::new(name);
        wf.metadata.folder = Some(folder.into());
        wf.metadata.author = author.map(str::to_string);
        wf.metadata.tags = tags.iter().map(|t| t.to_string()).collect();
        wf
    }

    fn list() -> Vec<SavedWorkflow> {
        vec![
            workflow("Washer leak", "Laundry", Some("Ana"), &["leak", "washer"]),
            workflow("Dryer squeal", "Laundry", Some("Bo"), &["noise"]),
            workflow("Oven igniter", "Cooking", None, &["gas"]),
        ]
    }

    #[test]
    fn test_recomputes_on_change() {
        let mut view = SearchView::new(list());
        assert_eq!(view.len(), 3);

        view.set_filter(WorkflowFilter::default().category("laundry"));
        assert_eq!(view.len(), 2);

        view.set_filter(WorkflowFilter::default().category("laundry").tag("noise"));
        let names: Vec<&str> = view.results().iter().map(|w| w.name()).collect();
        assert_eq!(names, vec!["Dryer squeal"]);

        let mut more = list();
        more.push(workflow("Washer squeal", "Laundry", None, &["noise"]));
        view.set_workflows(more);
        assert_eq!(view.len(), 2);

        view.clear_filter();
        assert_eq!(view.len(), 4);
    }

    #[test]
    fn test_fixed_clock() {
        let mut view = SearchView::new(list()).at(Utc::now() + Duration::days(40));
        view.set_filter(WorkflowFilter::default().date_range(DateRange::Month));
        assert!(view.is_empty());
    }

    #[test]
    fn test_facets() {
        let view = SearchView::new(list());
        let facets = view.facets();
        assert_eq!(facets.authors, vec!["Ana", "Bo"]);
        assert_eq!(facets.tags, vec!["gas", "leak", "noise", "washer"]);
        assert_eq!(facets.categories, vec!["Cooking", "Laundry"]);
    }
}
