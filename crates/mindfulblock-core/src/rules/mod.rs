//! Blocking rules: modes, the store, matching, CSV import and presets.

pub mod import;
pub mod matcher;
pub mod mode;
pub mod presets;
pub mod store;

pub use import::parse_csv;
pub use matcher::{RuleMatch, RuleMatcher};
pub use mode::BlockMode;
pub use presets::{Preset, PRESETS};
pub use store::{Group, GroupSummary, ImportEntry, Rule, RuleSnapshot, RuleStore, DEFAULT_GROUP};
