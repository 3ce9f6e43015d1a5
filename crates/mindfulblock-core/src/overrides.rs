//! Temporary per-hostname unlocks.
//!
//! The ledger is just a map of hostname to expiry (epoch milliseconds).
//! There is no timer: every query compares against the `now` the caller
//! passes in, so reloading the map at start-up restores it exactly.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::normalize;

/// How long a completed challenge unlocks a hostname.
pub const OVERRIDE_DURATION_MS: i64 = 10 * 60 * 1000;

pub fn override_duration() -> Duration {
    Duration::milliseconds(OVERRIDE_DURATION_MS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideEntry {
    #[serde(rename = "expiresAt")]
    pub expires_at_ms: i64,
}

impl OverrideEntry {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() < self.expires_at_ms
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideLedger {
    entries: HashMap<String, OverrideEntry>,
}

impl OverrideLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted `(hostname, expires_at_ms)` pairs.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(host, expires_at_ms)| (normalize(&host), OverrideEntry { expires_at_ms }))
                .collect(),
        }
    }

    /// Set (or overwrite) the unlock for `hostname` to `now + duration`.
    /// Returns the new expiry.
    pub fn grant(&mut self, hostname: &str, duration: Duration, now: DateTime<Utc>) -> i64 {
        let expires_at_ms = (now + duration).timestamp_millis();
        self.entries
            .insert(normalize(hostname), OverrideEntry { expires_at_ms });
        expires_at_ms
    }

    pub fn is_active(&self, hostname: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .get(&normalize(hostname))
            .is_some_and(|e| e.is_active(now))
    }

    /// Milliseconds left on the unlock, 0 when inactive.
    pub fn remaining_ms(&self, hostname: &str, now: DateTime<Utc>) -> i64 {
        self.entries
            .get(&normalize(hostname))
            .map(|e| (e.expires_at_ms - now.timestamp_millis()).max(0))
            .unwrap_or(0)
    }

    /// Unexpired entries, for display or persistence.
    pub fn active(&self, now: DateTime<Utc>) -> impl Iterator<Item = (&str, i64)> {
        self.entries
            .iter()
            .filter(move |(_, e)| e.is_active(now))
            .map(|(h, e)| (h.as_str(), e.expires_at_ms))
    }

    /// Drop expired entries. Never required for correctness.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_active(now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn grant_expires_after_duration() {
        let mut ledger = OverrideLedger::new();
        ledger.grant("youtube.com", Duration::milliseconds(600_000), t0());
        assert!(ledger.is_active("youtube.com", t0()));
        assert!(ledger.is_active("youtube.com", t0() + Duration::minutes(9)));
        assert!(!ledger.is_active("youtube.com", t0() + Duration::minutes(10)));
        assert!(!ledger.is_active("youtube.com", t0() + Duration::minutes(11)));
    }

    #[test]
    fn remaining_counts_down_to_zero() {
        let mut ledger = OverrideLedger::new();
        ledger.grant("x.com", override_duration(), t0());
        assert_eq!(ledger.remaining_ms("x.com", t0()), 600_000);
        assert_eq!(ledger.remaining_ms("x.com", t0() + Duration::minutes(4)), 360_000);
        assert_eq!(ledger.remaining_ms("x.com", t0() + Duration::hours(1)), 0);
        assert_eq!(ledger.remaining_ms("other.com", t0()), 0);
    }

    #[test]
    fn regrant_overwrites() {
        let mut ledger = OverrideLedger::new();
        ledger.grant("x.com", override_duration(), t0());
        let later = t0() + Duration::minutes(30);
        assert!(!ledger.is_active("x.com", later));
        ledger.grant("x.com", override_duration(), later);
        assert!(ledger.is_active("x.com", later));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn keys_are_normalized() {
        let mut ledger = OverrideLedger::new();
        ledger.grant("https://WWW.Reddit.com/r/rust", override_duration(), t0());
        assert!(ledger.is_active("reddit.com", t0()));
        assert!(!ledger.is_active("old.reddit.com", t0()));
    }

    #[test]
    fn prune_and_reload() {
        let mut ledger = OverrideLedger::new();
        ledger.grant("a.com", override_duration(), t0());
        ledger.grant("b.com", Duration::minutes(1), t0());
        let now = t0() + Duration::minutes(2);
        let saved: Vec<(String, i64)> = ledger.active(now).map(|(h, e)| (h.to_string(), e)).collect();
        assert_eq!(saved.len(), 1);

        let reloaded = OverrideLedger::from_entries(saved);
        assert!(reloaded.is_active("a.com", now));
        assert_eq!(ledger.prune(now), 1);
    }

    #[test]
    fn serializes_as_hostname_map() {
        let mut ledger = OverrideLedger::new();
        ledger.grant("a.com", override_duration(), t0());
        let json = serde_json::to_value(&ledger).unwrap();
        assert!(json["a.com"]["expiresAt"].is_i64());
    }
}
