//! Sync/apply bridge.
//!
//! Local mutation: validate, push to the repository, apply to the OS sink.
//! Repository change: the snapshot replaces the local store and is applied.
//!
//! Neither repository nor sink failures are returned to the caller. They
//! land in [`SyncStatus`] (and as events) so the UI can show an offline
//! badge or the privilege screen; the next rule change retries.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use super::repository::RuleRepository;
use super::types::{ApplySettings, Connectivity, EnforcementStatus, SyncStatus};
use crate::enforcement::{EnforcementRequest, EnforcementSink};
use crate::error::Result;
use crate::events::Event;
use crate::rules::{RuleSnapshot, RuleStore};

pub struct SyncBridge<R: RuleRepository, E: EnforcementSink> {
    repository: R,
    sink: E,
    updates: UnboundedReceiver<RuleSnapshot>,
    status: SyncStatus,
}

impl<R: RuleRepository, E: EnforcementSink> SyncBridge<R, E> {
    pub fn new(repository: R, sink: E) -> Self {
        let updates = repository.subscribe();
        Self {
            repository,
            sink,
            updates,
            status: SyncStatus::default(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }

    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    /// Build the initial store from the repository. When it is
    /// unreachable the returned store is empty and the bridge is offline.
    pub fn load(&mut self, now: DateTime<Utc>) -> (RuleStore, Vec<Event>) {
        match self.repository.fetch() {
            Ok(snapshot) => {
                let mut events = self.mark_online(now);
                let store = RuleStore::from_snapshot(snapshot);
                events.push(Event::RulesReplaced {
                    rule_count: store.rules().len(),
                    at: now,
                });
                (store, events)
            }
            Err(e) => (RuleStore::new(), self.mark_offline(e.to_string(), now)),
        }
    }

    /// Publish a local change and apply it.
    ///
    /// # Errors
    /// Only `SchemaValidation`, raised before anything is written. An
    /// unreachable repository turns the bridge offline instead.
    pub fn push_local(
        &mut self,
        store: &RuleStore,
        settings: ApplySettings,
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let snapshot = store.snapshot();
        snapshot.validate()?;

        let mut events = match self.repository.push(&snapshot) {
            Ok(()) => self.mark_online(now),
            Err(e) => self.mark_offline(e.to_string(), now),
        };
        events.push(self.apply(store, settings, now));
        Ok(events)
    }

    /// Drain repository updates. The newest snapshot, if it differs from
    /// the local state, replaces `store` and is applied.
    pub fn pump(&mut self, store: &mut RuleStore, settings: ApplySettings, now: DateTime<Utc>) -> Vec<Event> {
        let mut latest = None;
        loop {
            match self.updates.try_recv() {
                Ok(snapshot) => latest = Some(snapshot),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("repository subscription closed; resubscribing");
                    self.updates = self.repository.subscribe();
                    break;
                }
            }
        }

        let Some(snapshot) = latest else {
            return Vec::new();
        };
        let mut events = self.mark_online(now);
        if snapshot == store.snapshot() {
            return events;
        }

        *store = RuleStore::from_snapshot(snapshot);
        info!(rules = store.rules().len(), "rules replaced from repository");
        events.push(Event::RulesReplaced {
            rule_count: store.rules().len(),
            at: now,
        });
        events.push(self.apply(store, settings, now));
        events
    }

    /// Apply the store to the OS sink and record the outcome.
    pub fn apply(&mut self, store: &RuleStore, settings: ApplySettings, now: DateTime<Utc>) -> Event {
        let request = EnforcementRequest::from_store(store, settings.blocking_enabled, settings.language);
        match self.sink.apply(&request) {
            Ok(()) => {
                let active_rules = request.active_count();
                self.status.enforcement = EnforcementStatus::Applied { active_rules };
                self.status.last_applied_at = Some(now);
                Event::RulesApplied { active_rules, at: now }
            }
            Err(e) => {
                let admin_required = e.is_admin_required();
                warn!(error = %e, admin_required, "applying rules to the OS failed");
                self.status.enforcement = if admin_required {
                    EnforcementStatus::InsufficientPrivilege
                } else {
                    EnforcementStatus::Failed {
                        message: e.to_string(),
                    }
                };
                Event::EnforcementFailed {
                    admin_required,
                    message: e.to_string(),
                    at: now,
                }
            }
        }
    }

    /// Remove whatever the sink applied.
    pub fn clean(&mut self) -> Result<()> {
        self.sink.clean()?;
        self.status.enforcement = EnforcementStatus::NotApplied;
        Ok(())
    }

    fn mark_online(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        self.status.last_sync_at = Some(now);
        if self.status.is_online() {
            return Vec::new();
        }
        info!("rule repository reachable again");
        self.status.connectivity = Connectivity::Online;
        vec![Event::RepositoryOnline { at: now }]
    }

    fn mark_offline(&mut self, reason: String, now: DateTime<Utc>) -> Vec<Event> {
        warn!(%reason, "rule repository unavailable; keeping local rules");
        self.status.connectivity = Connectivity::Offline {
            reason: reason.clone(),
        };
        vec![Event::RepositoryOffline { message: reason, at: now }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforcement::EnforcedRule;
    use crate::error::CoreError;
    use crate::rules::BlockMode;
    use crate::sync::MemoryRepository;
    use std::cell::RefCell;
    use std::path::PathBuf;

    #[derive(Default)]
    struct RecordingSink {
        applied: RefCell<Vec<Vec<EnforcedRule>>>,
        deny: bool,
    }

    impl EnforcementSink for RecordingSink {
        fn apply(&self, request: &EnforcementRequest) -> Result<()> {
            if self.deny {
                return Err(CoreError::AdminPrivilegeRequired {
                    path: PathBuf::from("/etc/hosts"),
                });
            }
            self.applied.borrow_mut().push(request.rules.clone());
            Ok(())
        }

        fn clean(&self) -> Result<()> {
            self.applied.borrow_mut().clear();
            Ok(())
        }
    }

    fn settings() -> ApplySettings {
        ApplySettings::default()
    }

    #[test]
    fn push_local_writes_repository_and_applies() {
        let repo = MemoryRepository::new();
        let mut bridge = SyncBridge::new(&repo, RecordingSink::default());
        let mut store = RuleStore::new();
        store.add_rule("a.com", None, BlockMode::Hard).unwrap();

        let events = bridge.push_local(&store, settings(), Utc::now()).unwrap();
        assert!(events.iter().any(|e| matches!(e, Event::RulesApplied { active_rules: 1, .. })));
        assert_eq!(repo.fetch().unwrap().rules.len(), 1);
        assert_eq!(bridge.sink().applied.borrow().len(), 1);

        // The echo of our own push is not re-applied.
        let events = bridge.pump(&mut store, settings(), Utc::now());
        assert!(events.is_empty());
        assert_eq!(bridge.sink().applied.borrow().len(), 1);
    }

    #[test]
    fn offline_repository_keeps_local_state_and_still_applies() {
        let repo = MemoryRepository::new();
        repo.set_offline(true);
        let mut bridge = SyncBridge::new(&repo, RecordingSink::default());
        let mut store = RuleStore::new();
        store.add_rule("a.com", None, BlockMode::Hard).unwrap();

        let events = bridge.push_local(&store, settings(), Utc::now()).unwrap();
        assert!(matches!(events[0], Event::RepositoryOffline { .. }));
        assert!(!bridge.status().is_online());
        assert_eq!(store.rules().len(), 1);
        assert_eq!(bridge.sink().applied.borrow().len(), 1);

        repo.set_offline(false);
        let events = bridge.push_local(&store, settings(), Utc::now()).unwrap();
        assert!(matches!(events[0], Event::RepositoryOnline { .. }));
        assert!(bridge.status().is_online());
    }

    #[test]
    fn remote_snapshot_replaces_store_and_reapplies() {
        let repo = MemoryRepository::new();
        let mut bridge = SyncBridge::new(&repo, RecordingSink::default());
        let (mut store, _) = bridge.load(Utc::now());
        assert!(store.rules().is_empty());

        let mut remote = RuleStore::new();
        remote.add_rule("b.com", Some("News"), BlockMode::FrictionWait).unwrap();
        repo.push_remote(remote.snapshot());

        let events = bridge.pump(&mut store, settings(), Utc::now());
        assert!(events.iter().any(|e| matches!(e, Event::RulesReplaced { rule_count: 1, .. })));
        assert_eq!(store.find_by_domain("b.com").unwrap().group, "News");
        assert_eq!(bridge.sink().applied.borrow().len(), 1);
    }

    #[test]
    fn privilege_failure_downgrades_status_without_erroring() {
        let repo = MemoryRepository::new();
        let sink = RecordingSink {
            deny: true,
            ..RecordingSink::default()
        };
        let mut bridge = SyncBridge::new(&repo, sink);
        let store = RuleStore::new();
        let events = bridge.push_local(&store, settings(), Utc::now()).unwrap();
        assert!(matches!(
            events.last(),
            Some(Event::EnforcementFailed { admin_required: true, .. })
        ));
        assert_eq!(bridge.status().enforcement, EnforcementStatus::InsufficientPrivilege);
    }

    #[test]
    fn blocking_disabled_sends_nothing_active() {
        let repo = MemoryRepository::new();
        let mut bridge = SyncBridge::new(&repo, RecordingSink::default());
        let mut store = RuleStore::new();
        store.add_rule("a.com", None, BlockMode::Hard).unwrap();
        let off = ApplySettings {
            blocking_enabled: false,
            ..settings()
        };
        let event = bridge.apply(&store, off, Utc::now());
        assert!(matches!(event, Event::RulesApplied { active_rules: 0, .. }));
    }
}
