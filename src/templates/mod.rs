//! Template library: immutable built-in templates plus user templates kept
//! in the storage port.

mod builtin;
mod library;

pub use builtin::builtin_templates;
pub use library::{ALL_CATEGORIES, TemplateFilter, TemplateLibrary};
