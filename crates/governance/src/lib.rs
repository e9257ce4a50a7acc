//! Jalon governance orchestration.
//!
//! Sits between callers and the authoritative backend:
//!
//! - [`HierarchyStore`] — read-through projection cache of project
//!   hierarchies, invalidated after every successful mutation.
//! - [`InvitationRegistry`] — drives the leader/member invitation state
//!   machine; client-side validation and permission gates run before any
//!   network call, backend verdicts are final.
//! - [`HierarchyOps`] — permission- and budget-gated create/edit/delete of
//!   milestones, tasks, and subtasks.
//! - [`EventBus`] — in-process broadcast of governance events for the
//!   notification dispatcher.

pub mod error;
pub mod events;
pub mod ops;
pub mod registry;
pub mod store;

pub use error::{ErrorKind, GovernanceError};
pub use events::{EventBus, GovernanceEvent};
pub use ops::HierarchyOps;
pub use registry::InvitationRegistry;
pub use store::HierarchyStore;
