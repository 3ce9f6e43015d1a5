//! Arithmetic problems for the `friction_math` challenge.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathTier {
    /// `a × b`, both in 11..=20.
    Product,
    /// `a × b + c`, a in 15..=94, b in 3..=9, c in 10..=59.
    ProductPlus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathProblem {
    pub tier: MathTier,
    pub a: i64,
    pub b: i64,
    /// Addend, only for [`MathTier::ProductPlus`].
    pub c: Option<i64>,
}

impl MathProblem {
    /// Pick a tier uniformly, then its operands.
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Self {
                tier: MathTier::Product,
                a: rng.gen_range(11..=20),
                b: rng.gen_range(11..=20),
                c: None,
            }
        } else {
            Self {
                tier: MathTier::ProductPlus,
                a: rng.gen_range(15..=94),
                b: rng.gen_range(3..=9),
                c: Some(rng.gen_range(10..=59)),
            }
        }
    }

    pub fn answer(&self) -> i64 {
        self.a * self.b + self.c.unwrap_or(0)
    }

    /// Exact integer match; surrounding whitespace is ignored, anything
    /// that does not parse is wrong.
    pub fn check(&self, input: &str) -> bool {
        input.trim().parse::<i64>().is_ok_and(|n| n == self.answer())
    }
}

impl fmt::Display for MathProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.c {
            Some(c) => write!(f, "{} × {} + {} = ?", self.a, self.b, c),
            None => write!(f, "{} × {} = ?", self.a, self.b),
        }
    }
}
