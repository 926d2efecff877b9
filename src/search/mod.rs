//! Search and faceted filtering over saved workflows.

mod bucket;
mod filter;
mod view;

pub use bucket::{ComplexityBucket, DateRange, NodeCountBucket, complexity_score, workflow_complexity};
pub use filter::{WorkflowFilter, filter_workflows};
pub use view::{Facets, SearchView};
