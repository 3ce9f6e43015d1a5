//! One proof-of-intent challenge for one blocked navigation.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::math::MathProblem;
use crate::language::Language;
use crate::rules::BlockMode;

/// Countdown length for `friction_wait`.
pub const WAIT_SECS: i64 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChallengeKind {
    /// No way through.
    Hard,
    Math { problem: MathProblem },
    Wait { unlock_at: DateTime<Utc> },
    Typing { phrase: String },
}

impl ChallengeKind {
    pub fn new<R: Rng>(mode: BlockMode, language: Language, now: DateTime<Utc>, rng: &mut R) -> Self {
        match mode {
            BlockMode::Hard => ChallengeKind::Hard,
            BlockMode::FrictionMath => ChallengeKind::Math {
                problem: MathProblem::generate(rng),
            },
            BlockMode::FrictionWait => ChallengeKind::Wait {
                unlock_at: now + Duration::seconds(WAIT_SECS),
            },
            BlockMode::FrictionTyping => ChallengeKind::Typing {
                phrase: language.typing_phrase().to_string(),
            },
        }
    }
}

/// Result of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Attempt {
    Passed,
    /// Wrong; clear the input and let the user try again.
    Rejected { attempts: u32 },
    /// Countdown still running; the unlock action stays disabled.
    NotYet { remaining_ms: i64 },
    /// Hard block, nothing to submit.
    Unavailable,
    /// Passed on an earlier submit; nothing changes.
    AlreadyPassed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub hostname: String,
    /// Where to go once passed.
    pub target_url: String,
    pub mode: BlockMode,
    pub language: Language,
    pub kind: ChallengeKind,
    pub started_at: DateTime<Utc>,
    pub failed_attempts: u32,
    pub passed: bool,
}

impl Challenge {
    /// Text to show the user.
    pub fn prompt(&self) -> String {
        match (&self.kind, self.language) {
            (ChallengeKind::Hard, Language::Vi) => "Trang web này bị chặn hoàn toàn.".to_string(),
            (ChallengeKind::Hard, Language::En) => "This site is blocked with no override.".to_string(),
            (ChallengeKind::Math { problem }, _) => problem.to_string(),
            (ChallengeKind::Wait { .. }, Language::Vi) => {
                format!("Hít thở sâu... chờ {WAIT_SECS} giây.")
            }
            (ChallengeKind::Wait { .. }, Language::En) => {
                format!("Take a deep breath... wait {WAIT_SECS}s.")
            }
            (ChallengeKind::Typing { phrase }, _) => phrase.clone(),
        }
    }

    /// Whether the unlock action is enabled right now.
    pub fn can_submit(&self, now: DateTime<Utc>) -> bool {
        match &self.kind {
            ChallengeKind::Hard => false,
            _ if self.passed => false,
            ChallengeKind::Wait { unlock_at } => now >= *unlock_at,
            _ => true,
        }
    }

    /// Countdown remaining for wait challenges, 0 otherwise.
    pub fn remaining_wait_ms(&self, now: DateTime<Utc>) -> i64 {
        match &self.kind {
            ChallengeKind::Wait { unlock_at } => (*unlock_at - now).num_milliseconds().max(0),
            _ => 0,
        }
    }

    /// Check an answer. Wait challenges ignore `answer`: one click after
    /// the countdown is enough.
    pub fn submit(&mut self, answer: &str, now: DateTime<Utc>) -> Attempt {
        if self.passed {
            return Attempt::AlreadyPassed;
        }
        let correct = match &self.kind {
            ChallengeKind::Hard => return Attempt::Unavailable,
            ChallengeKind::Wait { .. } => {
                let remaining_ms = self.remaining_wait_ms(now);
                if remaining_ms > 0 {
                    return Attempt::NotYet { remaining_ms };
                }
                true
            }
            ChallengeKind::Math { problem } => problem.check(answer),
            ChallengeKind::Typing { phrase } => answer.trim().to_lowercase() == phrase.to_lowercase(),
        };

        if correct {
            self.passed = true;
            Attempt::Passed
        } else {
            self.failed_attempts += 1;
            Attempt::Rejected {
                attempts: self.failed_attempts,
            }
        }
    }
}
