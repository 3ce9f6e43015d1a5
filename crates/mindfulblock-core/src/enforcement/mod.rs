//! OS-level enforcement.

pub mod hosts;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::language::Language;
use crate::rules::RuleStore;

pub use hosts::HostsFileSink;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcedRule {
    pub domain: String,
    pub is_active: bool,
}

/// Payload handed to an enforcement sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementRequest {
    pub rules: Vec<EnforcedRule>,
    pub language: Language,
}

impl EnforcementRequest {
    /// Every rule, with its active flag; the sink decides what to skip.
    /// With blocking disabled every rule is sent inactive.
    pub fn from_store(store: &RuleStore, blocking_enabled: bool, language: Language) -> Self {
        Self {
            rules: store
                .rules()
                .iter()
                .map(|r| EnforcedRule {
                    domain: r.domain.clone(),
                    is_active: blocking_enabled && r.is_active,
                })
                .collect(),
            language,
        }
    }

    pub fn active_count(&self) -> usize {
        self.rules.iter().filter(|r| r.is_active).count()
    }
}

/// Something that applies a rule list at the OS level.
///
/// Implementations fail with `CoreError::AdminPrivilegeRequired` when the
/// process lacks the privilege to write.
pub trait EnforcementSink {
    fn apply(&self, request: &EnforcementRequest) -> Result<()>;

    /// Remove everything this sink ever applied.
    fn clean(&self) -> Result<()>;
}
