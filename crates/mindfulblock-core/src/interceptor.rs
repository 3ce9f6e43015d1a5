//! Navigation interception.
//!
//! [`evaluate`] is a pure function of the navigation and the current
//! rule/override state; evaluating the same event twice against the same
//! state gives the same [`Verdict`]. [`Interceptor`] wraps it with the
//! one side effect a block has: reporting it to analytics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analytics::{AnalyticsSink, ReportEvent};
use crate::domain::normalize;
use crate::events::Event;
use crate::language::Language;
use crate::overrides::OverrideLedger;
use crate::protocol::BlockPageParams;
use crate::rules::{RuleMatch, RuleMatcher};

/// An outgoing navigation as seen by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationEvent {
    pub url: String,
    /// Sub-frame navigations (iframes) are never intercepted.
    #[serde(default = "main_frame")]
    pub main_frame: bool,
}

fn main_frame() -> bool {
    true
}

impl NavigationEvent {
    pub fn main_frame(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            main_frame: true,
        }
    }
}

/// Everything [`evaluate`] reads.
pub struct InterceptState<'a, M: RuleMatcher + ?Sized> {
    pub matcher: &'a M,
    pub ledger: &'a OverrideLedger,
    pub blocking_enabled: bool,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AllowReason {
    NotMainFrame,
    BlockingDisabled,
    NoMatchingRule,
    OverrideActive { remaining_ms: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDecision {
    pub hostname: String,
    pub rule: RuleMatch,
    pub block_page: BlockPageParams,
}

impl BlockDecision {
    /// Whether a challenge can lift this block at all.
    pub fn overridable(&self) -> bool {
        self.rule.mode.allows_override()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Allow {
        hostname: String,
        #[serde(flatten)]
        reason: AllowReason,
    },
    Block(BlockDecision),
}

impl Verdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Block(_))
    }
}

/// Decide a navigation. No side effects.
pub fn evaluate<M: RuleMatcher + ?Sized>(
    event: &NavigationEvent,
    state: &InterceptState<'_, M>,
    now: DateTime<Utc>,
) -> Verdict {
    let hostname = normalize(&event.url);
    let allow = |reason| Verdict::Allow {
        hostname: hostname.clone(),
        reason,
    };

    if !event.main_frame {
        return allow(AllowReason::NotMainFrame);
    }
    if !state.blocking_enabled {
        return allow(AllowReason::BlockingDisabled);
    }
    let Some(rule) = state.matcher.match_host(&hostname) else {
        return allow(AllowReason::NoMatchingRule);
    };
    if state.ledger.is_active(&hostname, now) {
        return allow(AllowReason::OverrideActive {
            remaining_ms: state.ledger.remaining_ms(&hostname, now),
        });
    }

    Verdict::Block(BlockDecision {
        block_page: BlockPageParams {
            target_url: event.url.clone(),
            mode: rule.mode,
            language: state.language,
        },
        hostname,
        rule,
    })
}

/// Adapter that evaluates and reports blocks.
pub struct Interceptor<S: AnalyticsSink> {
    sink: S,
}

impl<S: AnalyticsSink> Interceptor<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Evaluate `event`; on a block, report it and return the matching event.
    pub fn handle<M: RuleMatcher + ?Sized>(
        &self,
        event: &NavigationEvent,
        state: &InterceptState<'_, M>,
        now: DateTime<Utc>,
    ) -> (Verdict, Option<Event>) {
        let verdict = evaluate(event, state, now);
        match &verdict {
            Verdict::Block(decision) => {
                debug!(hostname = %decision.hostname, rule = %decision.rule.domain, mode = %decision.rule.mode, "navigation blocked");
                self.sink.record(&ReportEvent::block(&decision.hostname));
                let emitted = Event::NavigationBlocked {
                    hostname: decision.hostname.clone(),
                    rule_domain: decision.rule.domain.clone(),
                    mode: decision.rule.mode,
                    at: now,
                };
                (verdict, Some(emitted))
            }
            Verdict::Allow { hostname, reason } => {
                debug!(%hostname, ?reason, "navigation allowed");
                (verdict, None)
            }
        }
    }
}
