//! Friction challenges: site-override challenges and typed confirmation
//! for destructive changes.

pub mod challenge;
pub mod confirm;
pub mod engine;
pub mod math;

pub use challenge::{Attempt, Challenge, ChallengeKind, WAIT_SECS};
pub use confirm::{ConfirmationPrompt, DestructiveAction, InputMethod};
pub use engine::{ChallengeOutcome, FrictionEngine};
pub use math::{MathProblem, MathTier};
