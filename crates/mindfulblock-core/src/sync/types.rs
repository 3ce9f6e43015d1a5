//! Status types for the sync/apply bridge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::language::Language;

/// Reachability of the rule repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Connectivity {
    #[default]
    Online,
    /// Last call failed; local state stays in effect.
    Offline { reason: String },
}

/// Outcome of the last OS apply.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EnforcementStatus {
    #[default]
    NotApplied,
    Applied { active_rules: usize },
    /// The UI should switch to its "needs administrator" screen.
    InsufficientPrivilege,
    Failed { message: String },
}

/// Current sync status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    pub connectivity: Connectivity,
    pub enforcement: EnforcementStatus,
    /// Last successful repository fetch or push.
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_applied_at: Option<DateTime<Utc>>,
}

impl SyncStatus {
    pub fn is_online(&self) -> bool {
        matches!(self.connectivity, Connectivity::Online)
    }
}

/// Settings that shape what reaches the OS sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplySettings {
    pub blocking_enabled: bool,
    pub language: Language,
}

impl Default for ApplySettings {
    fn default() -> Self {
        Self {
            blocking_enabled: true,
            language: Language::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_with_state_tags() {
        let status = SyncStatus {
            connectivity: Connectivity::Offline {
                reason: "timeout".into(),
            },
            enforcement: EnforcementStatus::Applied { active_rules: 3 },
            ..SyncStatus::default()
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["connectivity"]["state"], "offline");
        assert_eq!(json["enforcement"]["state"], "applied");
        assert_eq!(json["enforcement"]["active_rules"], 3);
        assert!(!status.is_online());
    }
}
