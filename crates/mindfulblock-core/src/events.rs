use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rules::BlockMode;

/// Every observable state change produces an Event.
/// The CLI prints them; a GUI or the companion endpoint may forward them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A main-frame navigation hit an active rule with no live override.
    NavigationBlocked {
        hostname: String,
        rule_domain: String,
        mode: BlockMode,
        at: DateTime<Utc>,
    },
    ChallengeStarted {
        hostname: String,
        mode: BlockMode,
        at: DateTime<Utc>,
    },
    /// Wrong answer; the input is cleared and the user may retry.
    ChallengeFailed {
        hostname: String,
        mode: BlockMode,
        attempts: u32,
        at: DateTime<Utc>,
    },
    OverrideGranted {
        hostname: String,
        expires_at_ms: i64,
        at: DateTime<Utc>,
    },
    /// Local rule state was replaced by a repository snapshot.
    RulesReplaced {
        rule_count: usize,
        at: DateTime<Utc>,
    },
    RulesApplied {
        active_rules: usize,
        at: DateTime<Utc>,
    },
    EnforcementFailed {
        admin_required: bool,
        message: String,
        at: DateTime<Utc>,
    },
    RepositoryOffline {
        message: String,
        at: DateTime<Utc>,
    },
    RepositoryOnline {
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::NavigationBlocked { at, .. }
            | Event::ChallengeStarted { at, .. }
            | Event::ChallengeFailed { at, .. }
            | Event::OverrideGranted { at, .. }
            | Event::RulesReplaced { at, .. }
            | Event::RulesApplied { at, .. }
            | Event::EnforcementFailed { at, .. }
            | Event::RepositoryOffline { at, .. }
            | Event::RepositoryOnline { at } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_internally_tagged() {
        let event = Event::OverrideGranted {
            hostname: "x.com".into(),
            expires_at_ms: 42,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "OverrideGranted");
        assert_eq!(json["hostname"], "x.com");
        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
