//! JSON import and export of workflow documents.
//!
//! Import runs in three steps: the text is parsed, the untyped value is
//! validated into an [`ImportReport`], and only a report without errors is
//! converted into a [`WorkflowDocument`](crate::model::WorkflowDocument).
//! Warnings never block an import.

mod export;
mod import;
mod report;

pub use export::{export_document, export_file_name, export_to_file, export_workflow};
pub use import::{ImportLimits, ImportedDocument, import_document, import_file, import_value, parse_json, validate_document};
pub use report::ImportReport;
