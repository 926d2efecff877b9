//! Talking to the outside world: the backend port, the offline mutation
//! queue and the retry policy both of them share.

mod backend;
mod conflict;
mod queue;
mod retry;
mod transport;

pub use backend::{MemBackend, RestBackend, WorkflowBackend, WorkflowRow};
pub use conflict::{ConflictResolution, has_conflict, resolve_conflict};
pub use queue::{HttpMethod, OfflineQueue, PendingMutation, SyncReport};
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, Transport};
