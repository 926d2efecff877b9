//! # Diagflow
//!
//! Diagflow models the diagnostic workflows technicians follow when repairing
//! appliances: a directed graph of typed steps (questions, measurements,
//! safety warnings, results) that is edited, validated, shared as JSON and
//! synced to a backend.
//!
//! ## Core Features
//!
//! - **Typed Workflow Model**: Twelve node kinds, each with its own payload and JSON schema
//! - **Safe Import/Export**: Structural, schema and content checks before anything is accepted
//! - **Template Library**: Built-in starting points plus persisted user templates
//! - **Search and Linting**: Faceted workflow search and a rule-based validation panel
//! - **Resilient Sync**: One retry policy for backend saves and offline queue replay
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use diagflow::{NodeType, Position, StudioBuilder, workflow::WorkflowGraph};
//!
//! let studio = StudioBuilder::new().build()?;
//! let mut workflow = studio.create_from_template("builtin_washer_no_drain", None).await?;
//!
//! let mut graph = WorkflowGraph::from(&workflow);
//! graph.add_node(NodeType::PhotoCapture.default_kind(), Position::new(250.0, 600.0))?;
//! graph.store_into(&mut workflow);
//! studio.save_workflow(&workflow).await?;
//! ```

mod builder;
mod config;
mod error;
pub mod exchange;
pub mod model;
pub mod search;
pub mod store;
mod studio;
pub mod sync;
pub mod templates;
mod utils;
pub mod validation;
pub mod workflow;

use std::sync::{Arc, RwLock};

pub use builder::StudioBuilder;
pub use config::{BackendConfig, Config, FileStoreConfig, ImportConfig, KeysConfig, OFFLINE_QUEUE_KEY, RetryConfig, StoreConfig, StoreType, USER_TEMPLATES_KEY};
pub use error::DiagflowError;
pub use model::*;
pub use studio::{ImportOutcome, Studio};

/// Result type alias for Diagflow operations.
pub type Result<T> = std::result::Result<T, DiagflowError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
