use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
    DiagflowError, Result,
    model::{SavedWorkflow, TemplateDraft, WorkflowTemplate},
    store::Store,
    templates::builtin_templates,
    utils,
};

/// Category value that disables category filtering.
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl TemplateFilter {
    pub fn category(
        mut self,
        category: impl Into<String>,
    ) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn search(
        mut self,
        search: impl Into<String>,
    ) -> Self {
        self.search = Some(search.into());
        self
    }

    fn matches(
        &self,
        template: &WorkflowTemplate,
    ) -> bool {
        let category_ok = match self.category.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(c) if c.eq_ignore_ascii_case(ALL_CATEGORIES) => true,
            Some(c) => template.category.to_lowercase() == c.to_lowercase(),
        };

        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(text) => {
                let needle = text.to_lowercase();
                template.name.to_lowercase().contains(&needle)
                    || template.description.to_lowercase().contains(&needle)
                    || template.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            }
        };

        category_ok && search_ok
    }
}

/// Built-in templates plus the user templates persisted under one storage key.
pub struct TemplateLibrary {
    store: Store,
    key: String,
    user: Vec<WorkflowTemplate>,
}

impl TemplateLibrary {
    /// Loads user templates from `store`. Unreadable data is logged and ignored.
    pub fn load(
        store: Store,
        key: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let user = match store.get_json::<Vec<WorkflowTemplate>>(&key) {
            Ok(user) => user.unwrap_or_default(),
            Err(e) => {
                warn!("ignoring stored user templates under {}: {}", key, e);
                Vec::new()
            }
        };
        debug!("loaded {} user templates", user.len());
        Self {
            store,
            key,
            user,
        }
    }

    pub fn builtins(&self) -> &'static [WorkflowTemplate] {
        builtin_templates()
    }

    pub fn user_templates(&self) -> &[WorkflowTemplate] {
        &self.user
    }

    /// Built-in templates first, then user templates in creation order.
    pub fn all(&self) -> Vec<&WorkflowTemplate> {
        self.builtins().iter().chain(self.user.iter()).collect()
    }

    pub fn get(
        &self,
        id: &str,
    ) -> Option<&WorkflowTemplate> {
        self.builtins().iter().chain(self.user.iter()).find(|t| t.id == id)
    }

    pub fn filter(
        &self,
        filter: &TemplateFilter,
    ) -> Vec<&WorkflowTemplate> {
        self.all().into_iter().filter(|t| filter.matches(t)).collect()
    }

    /// Distinct categories, sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self.all().into_iter().map(|t| t.category.clone()).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Stores a new user template and returns it.
    ///
    /// The in-memory list only changes when the write succeeds.
    pub fn save_user_template(
        &mut self,
        draft: TemplateDraft,
    ) -> Result<WorkflowTemplate> {
        if draft.name.trim().is_empty() {
            return Err(DiagflowError::Template("template name is required".into()));
        }

        let template = WorkflowTemplate {
            id: self.next_id(),
            name: draft.name,
            description: draft.description,
            category: draft.category,
            difficulty: draft.difficulty,
            estimated_time: draft.estimated_time,
            tags: draft.tags,
            is_public: draft.is_public,
            is_builtin: false,
            author: draft.author,
            created_at: Some(Utc::now()),
            nodes: draft.document.nodes,
            edges: draft.document.edges,
            node_counter: draft.document.node_counter,
        };

        let mut user = self.user.clone();
        user.push(template.clone());
        self.store.set_json(&self.key, &user)?;
        self.user = user;

        info!("saved user template {} ({})", template.id, template.name);
        Ok(template)
    }

    /// Deletes a user template. Built-in and unknown ids return `false`.
    pub fn delete(
        &mut self,
        id: &str,
    ) -> Result<bool> {
        if self.builtins().iter().any(|t| t.id == id) {
            warn!("refusing to delete built-in template {}", id);
            return Ok(false);
        }

        let Some(pos) = self.user.iter().position(|t| t.id == id) else {
            return Ok(false);
        };
        let mut user = self.user.clone();
        user.remove(pos);
        self.store.set_json(&self.key, &user)?;
        self.user = user;

        info!("deleted user template {}", id);
        Ok(true)
    }

    /// A new workflow seeded from template `id`.
    pub fn instantiate(
        &self,
        id: &str,
        name: Option<&str>,
    ) -> Result<SavedWorkflow> {
        let template = self.get(id).ok_or_else(|| DiagflowError::Template(format!("template {} not found", id)))?;
        Ok(template.instantiate(name))
    }

    fn next_id(&self) -> String {
        let base = format!("user_{}", utils::time::time_millis());
        let mut id = base.clone();
        let mut n = 1;
        while self.get(&id).is_some() {
            id = format!("{}_{}", base, n);
            n += 1;
        }
        id
    }
}
