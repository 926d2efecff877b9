//! Workflow linting and the panel presenting its results.

mod panel;
mod result;
mod rules;

pub use panel::{PanelState, SeverityCounts, ValidationPanel};
pub use result::{Category, Severity, ValidationResult};
pub use rules::{MAX_TITLE_CHARS, lint, lint_workflow};
