//! Hostname → rule matching shared by the desktop store and the
//! extension-side rule cache.

use serde::{Deserialize, Serialize};

use super::mode::BlockMode;
use crate::domain;

/// The rule that decided a navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMatch {
    /// Store id, absent when matching against a rule list fetched from
    /// the companion endpoint.
    pub rule_id: Option<String>,
    /// The rule's domain (not the navigated hostname).
    pub domain: String,
    pub mode: BlockMode,
}

/// Anything that can answer "which active rule covers this hostname?".
pub trait RuleMatcher {
    /// `hostname` must already be normalized.
    fn match_host(&self, hostname: &str) -> Option<RuleMatch>;
}

/// Pick the most specific candidate whose domain covers `hostname`.
///
/// Longest domain wins; equal lengths (only possible with duplicate
/// domains) resolve to the lexicographically smaller domain, then the
/// first in iteration order, so the result never depends on how a
/// caller happened to order its rules.
pub(crate) fn most_specific<'a, T, F>(
    hostname: &str,
    candidates: impl IntoIterator<Item = &'a T>,
    domain_of: F,
) -> Option<&'a T>
where
    T: 'a,
    F: Fn(&T) -> &str,
{
    let mut best: Option<&'a T> = None;
    for candidate in candidates {
        let d = domain_of(candidate);
        if !domain::matches(hostname, d) {
            continue;
        }
        best = match best {
            None => Some(candidate),
            Some(current) => {
                let cd = domain_of(current);
                if d.len() > cd.len() || (d.len() == cd.len() && d < cd) {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_domain_wins_regardless_of_order() {
        let a = ["example.com", "mail.example.com"];
        let b = ["mail.example.com", "example.com"];
        assert_eq!(
            most_specific("inbox.mail.example.com", a.iter(), |d| *d),
            Some(&"mail.example.com")
        );
        assert_eq!(
            most_specific("inbox.mail.example.com", b.iter(), |d| *d),
            Some(&"mail.example.com")
        );
        assert_eq!(most_specific("www2.example.com", b.iter(), |d| *d), Some(&"example.com"));
    }

    #[test]
    fn no_candidate_no_match() {
        let rules = ["example.com"];
        assert_eq!(most_specific("notexample.com", rules.iter(), |d| *d), None);
    }
}
