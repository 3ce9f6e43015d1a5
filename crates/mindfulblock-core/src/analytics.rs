//! Block/override telemetry.
//!
//! Reporting is best-effort everywhere: [`AnalyticsSink::record`] has no
//! error channel, and implementations log and swallow their failures so
//! a broken collector can never hold up a navigation.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::domain::normalize;

/// Minutes credited as "saved" for each blocked attempt.
pub const MINUTES_SAVED_PER_BLOCK: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Block,
    Override,
}

/// Body of the report endpoint: `{ "type": "block" | "override", "domain": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEvent {
    #[serde(rename = "type")]
    pub kind: ReportKind,
    #[serde(deserialize_with = "normalized_domain")]
    pub domain: String,
}

fn normalized_domain<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(|raw| normalize(&raw))
}

impl ReportEvent {
    pub fn block(domain: &str) -> Self {
        Self {
            kind: ReportKind::Block,
            domain: normalize(domain),
        }
    }

    pub fn override_granted(domain: &str) -> Self {
        Self {
            kind: ReportKind::Override,
            domain: normalize(domain),
        }
    }
}

/// External analytics collaborator.
pub trait AnalyticsSink {
    fn record(&self, event: &ReportEvent);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl AnalyticsSink for NoopSink {
    fn record(&self, _event: &ReportEvent) {}
}

/// Keeps events in memory; handy for tests and for batching.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ReportEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl AnalyticsSink for MemorySink {
    fn record(&self, event: &ReportEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Forwards events to a channel, e.g. a task posting to the report endpoint.
impl AnalyticsSink for UnboundedSender<ReportEvent> {
    fn record(&self, event: &ReportEvent) {
        if self.send(event.clone()).is_err() {
            warn!(domain = %event.domain, "analytics channel closed; event dropped");
        }
    }
}

impl<S: AnalyticsSink + ?Sized> AnalyticsSink for &S {
    fn record(&self, event: &ReportEvent) {
        (**self).record(event)
    }
}

impl<S: AnalyticsSink + ?Sized> AnalyticsSink for std::sync::Arc<S> {
    fn record(&self, event: &ReportEvent) {
        (**self).record(event)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCounts {
    pub blocked: u64,
    pub overridden: u64,
}

/// One UTC day of counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub domains: BTreeMap<String, DomainCounts>,
}

impl DailyStats {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            domains: BTreeMap::new(),
        }
    }

    pub fn apply(&mut self, event: &ReportEvent) {
        let counts = self.domains.entry(event.domain.clone()).or_default();
        match event.kind {
            ReportKind::Block => counts.blocked += 1,
            ReportKind::Override => counts.overridden += 1,
        }
    }

    pub fn summary(&self) -> DailySummary {
        let total_blocked: u64 = self.domains.values().map(|c| c.blocked).sum();
        let total_overrides: u64 = self.domains.values().map(|c| c.overridden).sum();

        let mut top: Vec<(String, DomainCounts)> =
            self.domains.iter().map(|(d, c)| (d.clone(), *c)).collect();
        top.sort_by(|a, b| b.1.blocked.cmp(&a.1.blocked).then_with(|| a.0.cmp(&b.0)));
        top.truncate(5);

        DailySummary {
            date: self.date,
            total_blocked,
            total_overrides,
            time_saved_minutes: total_blocked * MINUTES_SAVED_PER_BLOCK,
            top_domains: top,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_blocked: u64,
    pub total_overrides: u64,
    pub time_saved_minutes: u64,
    pub top_domains: Vec<(String, DomainCounts)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_event_wire_shape() {
        let json = serde_json::to_string(&ReportEvent::block("https://www.YouTube.com/x")).unwrap();
        assert_eq!(json, r#"{"type":"block","domain":"youtube.com"}"#);
        let e: ReportEvent = serde_json::from_str(r#"{"type":"override","domain":"x.com"}"#).unwrap();
        assert_eq!(e.kind, ReportKind::Override);
    }

    #[test]
    fn incoming_report_domain_is_normalized() {
        let e: ReportEvent =
            serde_json::from_str(r#"{"type":"block","domain":"https://WWW.Example.com/path"}"#).unwrap();
        assert_eq!(e, ReportEvent::block("example.com"));
    }

    #[test]
    fn summary_counts_and_time_saved() {
        let mut day = DailyStats::new(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        for _ in 0..3 {
            day.apply(&ReportEvent::block("youtube.com"));
        }
        day.apply(&ReportEvent::block("reddit.com"));
        day.apply(&ReportEvent::override_granted("youtube.com"));

        let s = day.summary();
        assert_eq!(s.total_blocked, 4);
        assert_eq!(s.total_overrides, 1);
        assert_eq!(s.time_saved_minutes, 20);
        assert_eq!(s.top_domains[0].0, "youtube.com");
        assert_eq!(s.top_domains[0].1, DomainCounts { blocked: 3, overridden: 1 });
    }

    #[test]
    fn channel_sink_forwards_and_survives_closed_receiver() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.record(&ReportEvent::block("a.com"));
        assert_eq!(rx.try_recv().unwrap().domain, "a.com");
        drop(rx);
        tx.record(&ReportEvent::block("b.com"));
    }
}
