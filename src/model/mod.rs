mod edge;
mod node;
mod template;
mod workflow;

pub use edge::{EdgeId, WorkflowEdge};
pub use node::*;
pub use template::{Difficulty, TemplateDraft, WorkflowTemplate};
pub use workflow::{SavedWorkflow, WorkflowDocument, WorkflowMetadata};
