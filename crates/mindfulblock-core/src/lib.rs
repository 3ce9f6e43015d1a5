//! # MindfulBlock Core Library
//!
//! Core logic for MindfulBlock, a website blocker that adds friction
//! (math, waiting, typing) before letting you through instead of only
//! saying no. Everything is usable from the `mindfulblock` CLI; a browser
//! extension talks to the same core through the companion HTTP endpoint.
//!
//! ## Architecture
//!
//! - **Rules**: domain normalization, the rule/group store, CSV import and presets
//! - **Interception**: pure allow/block decisions for outgoing navigations
//! - **Friction**: override challenges and typed confirmation for destructive edits
//! - **Overrides**: time-limited per-host bypasses
//! - **Sync**: keeps the store, a rule repository and OS enforcement consistent
//! - **Storage**: SQLite persistence and TOML configuration
//!
//! ## Key Components
//!
//! - [`RuleStore`]: rules and groups with their invariants
//! - [`Interceptor`]: navigation decisions
//! - [`FrictionEngine`]: challenges and override grants
//! - [`SyncBridge`]: repository sync and hosts-file apply
//! - [`Database`]: local persistence

pub mod analytics;
pub mod domain;
pub mod enforcement;
pub mod error;
pub mod events;
pub mod extension;
pub mod friction;
pub mod interceptor;
pub mod language;
pub mod overrides;
pub mod protocol;
pub mod rules;
pub mod storage;
pub mod sync;

pub use analytics::{AnalyticsSink, DailyStats, DailySummary, ReportEvent, ReportKind};
pub use enforcement::{EnforcementRequest, EnforcementSink, HostsFileSink};
pub use error::{ConfigError, CoreError, DatabaseError};
pub use events::Event;
pub use friction::{Challenge, ChallengeOutcome, ConfirmationPrompt, DestructiveAction, FrictionEngine};
pub use interceptor::{evaluate, BlockDecision, InterceptState, Interceptor, NavigationEvent, Verdict};
pub use language::Language;
pub use overrides::OverrideLedger;
pub use protocol::{BlockPageParams, RuleEntry, RuleList};
pub use rules::{BlockMode, Group, Rule, RuleSnapshot, RuleStore};
pub use storage::{Config, Database};
pub use sync::{ApplySettings, SyncBridge, SyncStatus};
