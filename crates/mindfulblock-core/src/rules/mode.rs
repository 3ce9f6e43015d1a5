//! Block modes.
//!
//! Rule documents written by older clients carry mode strings such as
//! `HARD`, `friction` or `timed`. They are mapped to the canonical set
//! by [`BlockMode::migrate`] whenever a mode crosses a storage or wire
//! boundary; serialization always writes the canonical name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BlockMode {
    /// No override path at all.
    Hard,
    /// Solve an arithmetic problem.
    FrictionMath,
    /// Sit through a countdown.
    FrictionWait,
    /// Retype a fixed phrase.
    FrictionTyping,
}

impl BlockMode {
    pub const ALL: [BlockMode; 4] = [
        BlockMode::Hard,
        BlockMode::FrictionMath,
        BlockMode::FrictionWait,
        BlockMode::FrictionTyping,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BlockMode::Hard => "hard",
            BlockMode::FrictionMath => "friction_math",
            BlockMode::FrictionWait => "friction_wait",
            BlockMode::FrictionTyping => "friction_typing",
        }
    }

    /// Map any known mode spelling, current or legacy, to its canonical variant.
    ///
    /// The CSV vocabulary `hard | friction | timed` maps to
    /// `hard | friction_math | friction_wait`.
    pub fn migrate(raw: &str) -> Result<Self, CoreError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hard" => Ok(BlockMode::Hard),
            "friction" | "math" | "friction_math" => Ok(BlockMode::FrictionMath),
            "timed" | "wait" | "friction_wait" => Ok(BlockMode::FrictionWait),
            "typing" | "friction_typing" => Ok(BlockMode::FrictionTyping),
            _ => Err(CoreError::UnknownMode(raw.to_string())),
        }
    }

    /// Whether completing a challenge can unlock a site under this mode.
    pub fn allows_override(self) -> bool {
        !matches!(self, BlockMode::Hard)
    }
}

impl Default for BlockMode {
    fn default() -> Self {
        BlockMode::Hard
    }
}

impl fmt::Display for BlockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for BlockMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::migrate(s)
    }
}

impl TryFrom<String> for BlockMode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::migrate(&value)
    }
}

impl From<BlockMode> for String {
    fn from(mode: BlockMode) -> Self {
        mode.as_str().to_string()
    }
}
