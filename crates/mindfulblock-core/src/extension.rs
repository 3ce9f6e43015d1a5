//! Browser-side client of the companion endpoint.
//!
//! The extension keeps a [`RuleCache`] filled by a [`RulePoller`] and
//! reports blocks/overrides with a [`ReportClient`].
//!
//! Polling is fail-open on purpose: when the desktop app is unreachable
//! the last rule list that was fetched keeps being enforced (or none, if
//! nothing was ever fetched), and the next tick simply tries again.

use chrono::{DateTime, Utc};
use reqwest::Client;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};
use url::Url;

use crate::analytics::ReportEvent;
use crate::error::{ConfigError, Result};
use crate::language::Language;
use crate::protocol::{RuleEntry, RuleList, RuleListResponse};
use crate::rules::matcher::most_specific;
use crate::rules::{RuleMatch, RuleMatcher};

/// Last-known rule list.
#[derive(Debug, Clone, Default)]
pub struct RuleCache {
    list: Option<RuleList>,
    fetched_at: Option<DateTime<Utc>>,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, list: RuleList, now: DateTime<Utc>) {
        self.list = Some(list);
        self.fetched_at = Some(now);
    }

    pub fn rules(&self) -> &[RuleEntry] {
        self.list.as_ref().map(|l| l.rules.as_slice()).unwrap_or(&[])
    }

    pub fn language(&self) -> Language {
        self.list.as_ref().map(|l| l.language).unwrap_or_default()
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }
}

impl RuleMatcher for RuleCache {
    fn match_host(&self, hostname: &str) -> Option<RuleMatch> {
        most_specific(hostname, self.rules(), |r| r.domain.as_str()).map(|r| RuleMatch {
            rule_id: None,
            domain: r.domain.clone(),
            mode: r.mode,
        })
    }
}

/// HTTP client for `/rules` and `/report`.
#[derive(Debug, Clone)]
pub struct CompanionClient {
    http: Client,
    base: Url,
}

impl CompanionClient {
    pub fn new(server_url: &str) -> Result<Self> {
        let base = Url::parse(server_url).map_err(|e| ConfigError::InvalidValue {
            key: "extension.server_url".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base.join(path).map_err(|e| {
            ConfigError::InvalidValue {
                key: "extension.server_url".to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Fetch and normalize the rule list, accepting either wire shape.
    pub async fn fetch_rules(&self) -> Result<RuleList> {
        let resp = self
            .http
            .get(self.endpoint("rules")?)
            .send()
            .await?
            .error_for_status()?;
        let body: RuleListResponse = resp.json().await?;
        Ok(body.into_rule_list())
    }

    pub async fn post_report(&self, event: &ReportEvent) -> Result<()> {
        self.http
            .post(self.endpoint("report")?)
            .json(event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Periodically refreshes a shared [`RuleCache`].
pub struct RulePoller {
    client: CompanionClient,
    cache: Arc<RwLock<RuleCache>>,
    interval: Duration,
}

impl RulePoller {
    pub fn new(client: CompanionClient, cache: Arc<RwLock<RuleCache>>, interval: Duration) -> Self {
        Self {
            client,
            cache,
            interval,
        }
    }

    /// One fetch. Returns whether the cache was refreshed; on failure the
    /// cache is left untouched.
    pub async fn poll_once(&self) -> bool {
        match self.client.fetch_rules().await {
            Ok(list) => {
                let count = list.rules.len();
                match self.cache.write() {
                    Ok(mut cache) => cache.replace(list, Utc::now()),
                    Err(_) => {
                        warn!("rule cache lock poisoned");
                        return false;
                    }
                }
                debug!(rules = count, "rule cache refreshed");
                true
            }
            Err(e) => {
                warn!(error = %e, "rule poll failed; keeping last known rules");
                false
            }
        }
    }

    /// Poll forever at the configured interval, starting immediately.
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "rule poller started");
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }
}

/// Best-effort forwarding of report events.
pub struct ReportClient {
    client: CompanionClient,
}

impl ReportClient {
    pub fn new(client: CompanionClient) -> Self {
        Self { client }
    }

    /// Send one event; errors are logged and dropped.
    pub async fn send(&self, event: &ReportEvent) {
        if let Err(e) = self.client.post_report(event).await {
            warn!(domain = %event.domain, error = %e, "report failed");
        }
    }

    /// Drain a channel fed by an `AnalyticsSink` until every sender is gone.
    pub async fn forward(self, mut rx: UnboundedReceiver<ReportEvent>) {
        while let Some(event) = rx.recv().await {
            self.send(&event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::BlockMode;

    fn cache_with(rules: &[(&str, BlockMode)]) -> RuleCache {
        let mut cache = RuleCache::new();
        cache.replace(
            RuleList {
                rules: rules
                    .iter()
                    .map(|(d, m)| RuleEntry {
                        domain: d.to_string(),
                        mode: *m,
                    })
                    .collect(),
                language: Language::En,
            },
            Utc::now(),
        );
        cache
    }

    #[test]
    fn cache_matches_like_the_store() {
        let cache = cache_with(&[("example.com", BlockMode::Hard), ("mail.example.com", BlockMode::FrictionMath)]);
        assert_eq!(cache.match_host("a.mail.example.com").unwrap().mode, BlockMode::FrictionMath);
        assert_eq!(cache.match_host("example.com").unwrap().mode, BlockMode::Hard);
        assert!(cache.match_host("notexample.com").is_none());
        assert_eq!(cache.language(), Language::En);
    }

    #[test]
    fn empty_cache_defaults() {
        let cache = RuleCache::new();
        assert!(cache.rules().is_empty());
        assert_eq!(cache.language(), Language::Vi);
        assert!(cache.match_host("x.com").is_none());
    }

    #[test]
    fn rejects_bad_server_url() {
        assert!(CompanionClient::new("not a url").is_err());
    }

    #[tokio::test]
    async fn poll_accepts_legacy_shape() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rules")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"["youtube.com","www.reddit.com"]"#)
            .create_async()
            .await;

        let cache = Arc::new(RwLock::new(RuleCache::new()));
        let poller = RulePoller::new(
            CompanionClient::new(&server.url()).unwrap(),
            cache.clone(),
            Duration::from_secs(30),
        );
        assert!(poller.poll_once().await);
        mock.assert_async().await;

        let cache = cache.read().unwrap();
        assert_eq!(cache.rules().len(), 2);
        assert_eq!(cache.rules()[1].domain, "reddit.com");
        assert_eq!(cache.rules()[0].mode, BlockMode::FrictionMath);
        assert_eq!(cache.language(), Language::Vi);
    }

    #[tokio::test]
    async fn failed_poll_keeps_last_known_rules() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("GET", "/rules")
            .with_status(200)
            .with_body(r#"{"rules":[{"domain":"x.com","mode":"friction_wait"}],"language":"en"}"#)
            .expect(1)
            .create_async()
            .await;

        let cache = Arc::new(RwLock::new(RuleCache::new()));
        let poller = RulePoller::new(
            CompanionClient::new(&server.url()).unwrap(),
            cache.clone(),
            Duration::from_secs(30),
        );
        assert!(poller.poll_once().await);
        ok.assert_async().await;
        ok.remove_async().await;

        server
            .mock("GET", "/rules")
            .with_status(500)
            .create_async()
            .await;
        assert!(!poller.poll_once().await);

        let cache = cache.read().unwrap();
        assert_eq!(cache.rules().len(), 1);
        assert_eq!(cache.rules()[0].mode, BlockMode::FrictionWait);
    }

    #[tokio::test]
    async fn report_errors_are_swallowed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/report")
            .match_body(mockito::Matcher::Json(serde_json::json!({"type":"block","domain":"x.com"})))
            .with_status(503)
            .create_async()
            .await;

        let reporter = ReportClient::new(CompanionClient::new(&server.url()).unwrap());
        reporter.send(&ReportEvent::block("x.com")).await;
        mock.assert_async().await;

        // Nothing listening at all.
        let offline = ReportClient::new(CompanionClient::new("http://127.0.0.1:9").unwrap());
        offline.send(&ReportEvent::block("x.com")).await;
    }

    #[tokio::test]
    async fn forward_drains_channel() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/report")
            .with_status(204)
            .expect(2)
            .create_async()
            .await;

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(ReportEvent::block("a.com")).unwrap();
        tx.send(ReportEvent::override_granted("a.com")).unwrap();
        drop(tx);
        ReportClient::new(CompanionClient::new(&server.url()).unwrap())
            .forward(rx)
            .await;
        mock.assert_async().await;
    }
}
