mod workflow;

pub use workflow::{WorkflowGraph, derive_node_counter};
