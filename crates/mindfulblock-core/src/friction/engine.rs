//! Challenge lifecycle: start one for a blocked navigation, feed it
//! answers, and on success unlock the hostname.

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::challenge::{Attempt, Challenge, ChallengeKind};
use crate::analytics::{AnalyticsSink, ReportEvent};
use crate::events::Event;
use crate::interceptor::BlockDecision;
use crate::overrides::{override_duration, OverrideLedger};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChallengeOutcome {
    /// Passed: the hostname is unlocked, go to `navigate_to`.
    Unlocked {
        navigate_to: String,
        expires_at_ms: i64,
    },
    Retry {
        attempts: u32,
    },
    Waiting {
        remaining_ms: i64,
    },
    /// Hard mode: the block stands.
    Denied,
}

pub struct FrictionEngine<R = Mcg128Xsl64> {
    rng: R,
}

impl FrictionEngine<Mcg128Xsl64> {
    /// Seeded for reproducible challenges, entropy otherwise.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self { rng }
    }
}

impl<R: Rng> FrictionEngine<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Build the challenge for a block decision.
    pub fn start(&mut self, decision: &BlockDecision, now: DateTime<Utc>) -> (Challenge, Event) {
        let params = &decision.block_page;
        let kind = ChallengeKind::new(params.mode, params.language, now, &mut self.rng);
        let challenge = Challenge {
            hostname: decision.hostname.clone(),
            target_url: params.target_url.clone(),
            mode: params.mode,
            language: params.language,
            kind,
            started_at: now,
            failed_attempts: 0,
            passed: false,
        };
        debug!(hostname = %challenge.hostname, mode = %challenge.mode, "challenge started");
        let event = Event::ChallengeStarted {
            hostname: challenge.hostname.clone(),
            mode: challenge.mode,
            at: now,
        };
        (challenge, event)
    }

    /// Submit an answer. On success the ledger is written and an override
    /// is reported; nothing else changes. Submitting a challenge that has
    /// already passed reports the existing unlock without granting again.
    pub fn submit<S: AnalyticsSink>(
        &self,
        challenge: &mut Challenge,
        answer: &str,
        ledger: &mut OverrideLedger,
        sink: &S,
        now: DateTime<Utc>,
    ) -> (ChallengeOutcome, Option<Event>) {
        match challenge.submit(answer, now) {
            Attempt::Passed => {
                let expires_at_ms = ledger.grant(&challenge.hostname, override_duration(), now);
                sink.record(&ReportEvent::override_granted(&challenge.hostname));
                info!(hostname = %challenge.hostname, expires_at_ms, "override granted");
                (
                    ChallengeOutcome::Unlocked {
                        navigate_to: challenge.target_url.clone(),
                        expires_at_ms,
                    },
                    Some(Event::OverrideGranted {
                        hostname: challenge.hostname.clone(),
                        expires_at_ms,
                        at: now,
                    }),
                )
            }
            Attempt::Rejected { attempts } => (
                ChallengeOutcome::Retry { attempts },
                Some(Event::ChallengeFailed {
                    hostname: challenge.hostname.clone(),
                    mode: challenge.mode,
                    attempts,
                    at: now,
                }),
            ),
            Attempt::NotYet { remaining_ms } => (ChallengeOutcome::Waiting { remaining_ms }, None),
            Attempt::Unavailable => (ChallengeOutcome::Denied, None),
            Attempt::AlreadyPassed => (
                ChallengeOutcome::Unlocked {
                    navigate_to: challenge.target_url.clone(),
                    expires_at_ms: now.timestamp_millis()
                        + ledger.remaining_ms(&challenge.hostname, now),
                },
                None,
            ),
        }
    }
}
