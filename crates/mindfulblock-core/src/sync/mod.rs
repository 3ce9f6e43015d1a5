//! Rule synchronization and OS apply.
//!
//! Keeps the local [`RuleStore`](crate::rules::RuleStore) and a
//! [`RuleRepository`] in step and pushes every accepted rule set to an
//! [`EnforcementSink`](crate::enforcement::EnforcementSink).

pub mod bridge;
pub mod repository;
pub mod types;

pub use bridge::SyncBridge;
pub use repository::{MemoryRepository, RuleRepository, Subscribers};
pub use types::{ApplySettings, Connectivity, EnforcementStatus, SyncStatus};
