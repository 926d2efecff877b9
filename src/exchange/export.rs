use std::path::Path;

use tracing::info;

use crate::{
    Result,
    model::{SavedWorkflow, WorkflowDocument},
};

/// Pretty-printed JSON of a document, the format [`crate::exchange::import_document`] reads back.
pub fn export_document(document: &WorkflowDocument) -> Result<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

pub fn export_workflow(workflow: &SavedWorkflow) -> Result<String> {
    export_document(&workflow.to_document())
}

/// Suggested download name: the workflow name lowercased with runs of
/// non-alphanumerics collapsed to `-`.
pub fn export_file_name(name: &str) -> String {
    let mut slug = String::new();
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() { "workflow.json".to_string() } else { format!("{}.json", slug) }
}

pub fn export_to_file<T: AsRef<Path>>(
    document: &WorkflowDocument,
    path: T,
) -> Result<()> {
    let text = export_document(document)?;
    std::fs::write(path.as_ref(), text)?;
    info!("exported workflow to {}", path.as_ref().display());
    Ok(())
}
