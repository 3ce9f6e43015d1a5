//! Store + SQLite repository + hosts file, wired through the bridge.

use chrono::{Duration, Utc};
use mindfulblock_core::enforcement::hosts::{SECTION_END, SECTION_START};
use mindfulblock_core::rules::{parse_csv, presets};
use mindfulblock_core::sync::{EnforcementStatus, MemoryRepository};
use mindfulblock_core::{
    ApplySettings, BlockMode, CoreError, Database, Event, HostsFileSink, Language, OverrideLedger,
    RuleStore, SyncBridge,
};
use tempfile::TempDir;

fn hosts(dir: &TempDir) -> HostsFileSink {
    let path = dir.path().join("hosts");
    std::fs::write(&path, "127.0.0.1 localhost\n").unwrap();
    HostsFileSink::at(path)
}

#[test]
fn local_change_is_persisted_and_applied() {
    let dir = TempDir::new().unwrap();
    let db = Database::open_at(&dir.path().join("mb.db")).unwrap();
    let mut bridge = SyncBridge::new(&db, hosts(&dir));
    let now = Utc::now();

    let (mut store, _) = bridge.load(now);
    assert!(bridge.status().is_online());
    store.add_rule("youtube.com", None, BlockMode::FrictionMath).unwrap();
    let id = store.add_rule("reddit.com", None, BlockMode::Hard).unwrap().id;
    store.toggle_rule(&id).unwrap();

    let events = bridge.push_local(&store, ApplySettings::default(), now).unwrap();
    assert!(events.iter().any(|e| matches!(e, Event::RulesApplied { active_rules: 1, .. })));
    assert_eq!(bridge.sink().applied_domains().unwrap(), vec!["youtube.com".to_string()]);

    let content = std::fs::read_to_string(bridge.sink().path()).unwrap();
    assert!(content.starts_with("127.0.0.1 localhost"));
    assert!(content.contains(SECTION_START) && content.contains(SECTION_END));
    assert!(content.contains("::1 www.youtube.com"));

    // A fresh process sees the same rules.
    drop(bridge);
    let reopened = Database::open_at(&dir.path().join("mb.db")).unwrap();
    let loaded = RuleStore::from_snapshot(reopened.load_snapshot().unwrap());
    assert_eq!(loaded.snapshot(), store.snapshot());
}

#[test]
fn clean_leaves_foreign_lines_alone() {
    let dir = TempDir::new().unwrap();
    let mut bridge = SyncBridge::new(MemoryRepository::new(), hosts(&dir));
    let now = Utc::now();
    let (mut store, _) = bridge.load(now);
    store.add_rule("x.com", None, BlockMode::Hard).unwrap();
    bridge.push_local(&store, ApplySettings::default(), now).unwrap();

    bridge.clean().unwrap();
    assert_eq!(bridge.status().enforcement, EnforcementStatus::NotApplied);
    let content = std::fs::read_to_string(bridge.sink().path()).unwrap();
    assert!(content.contains("127.0.0.1 localhost"));
    assert!(!content.contains(SECTION_START));
}

#[test]
fn offline_repository_still_applies_locally() {
    let dir = TempDir::new().unwrap();
    let repo = MemoryRepository::new();
    let mut bridge = SyncBridge::new(&repo, hosts(&dir));
    let now = Utc::now();
    let (mut store, _) = bridge.load(now);

    repo.set_offline(true);
    store.add_rule("x.com", None, BlockMode::FrictionTyping).unwrap();
    let events = bridge.push_local(&store, ApplySettings::default(), now).unwrap();
    assert!(!bridge.status().is_online());
    assert!(events.iter().any(|e| matches!(e, Event::RepositoryOffline { .. })));
    assert_eq!(bridge.sink().applied_domains().unwrap(), vec!["x.com".to_string()]);

    repo.set_offline(false);
    bridge.push_local(&store, ApplySettings::default(), now).unwrap();
    assert!(bridge.status().is_online());
}

#[test]
fn remote_update_replaces_store_and_reapplies() {
    let dir = TempDir::new().unwrap();
    let repo = MemoryRepository::new();
    let mut bridge = SyncBridge::new(&repo, hosts(&dir));
    let now = Utc::now();
    let (mut store, _) = bridge.load(now);

    let mut remote = RuleStore::new();
    remote.add_rule("tiktok.com", Some("Social"), BlockMode::FrictionWait).unwrap();
    repo.push_remote(remote.snapshot());

    let settings = ApplySettings {
        blocking_enabled: true,
        language: Language::En,
    };
    let events = bridge.pump(&mut store, settings, now);
    assert!(events.iter().any(|e| matches!(e, Event::RulesReplaced { rule_count: 1, .. })));
    assert_eq!(store.snapshot(), remote.snapshot());
    assert_eq!(bridge.sink().applied_domains().unwrap(), vec!["tiktok.com".to_string()]);

    // Nothing new: no events, nothing re-applied.
    assert!(bridge.pump(&mut store, settings, now).is_empty());
}

#[test]
fn remote_rules_with_hostile_domains_never_reach_the_hosts_file() {
    let dir = TempDir::new().unwrap();
    let repo = MemoryRepository::new();
    let mut bridge = SyncBridge::new(&repo, hosts(&dir));
    let now = Utc::now();
    let (mut store, _) = bridge.load(now);

    let mut remote = RuleStore::new();
    remote.add_rule("tiktok.com", None, BlockMode::Hard).unwrap();
    let mut snapshot = remote.snapshot();
    let mut hostile = snapshot.rules[0].clone();
    hostile.id = "injected".into();
    hostile.domain = "evil.com\n10.6.6.6 bank.com".into();
    snapshot.rules.push(hostile);
    repo.push_remote(snapshot);

    let events = bridge.pump(&mut store, ApplySettings::default(), now);
    assert!(events.iter().any(|e| matches!(e, Event::RulesReplaced { rule_count: 1, .. })));
    assert!(store.find_by_domain("tiktok.com").is_some());

    let content = std::fs::read_to_string(bridge.sink().path()).unwrap();
    assert!(!content.contains("bank.com"), "injected hosts line:\n{content}");
    assert_eq!(bridge.sink().applied_domains().unwrap(), vec!["tiktok.com".to_string()]);
}

#[test]
fn group_delete_cascades_through_persistence() {
    let db = Database::open_memory().unwrap();
    let mut store = RuleStore::new();
    let preset = presets::find("social_media").unwrap();
    let added = store.import_rules(preset.entries(BlockMode::FrictionMath));
    assert_eq!(added, preset.domains.len());
    store.add_rule("news.ycombinator.com", None, BlockMode::Hard).unwrap();
    db.save_snapshot(&store.snapshot()).unwrap();

    let mut store = RuleStore::from_snapshot(db.load_snapshot().unwrap());
    assert_eq!(store.delete_group(&preset.group), Some(preset.domains.len()));
    assert!(store.group(&preset.group).is_none());
    assert_eq!(store.rules().len(), 1);
    assert_eq!(store.delete_group("general"), None);
    db.save_snapshot(&store.snapshot()).unwrap();
    assert_eq!(db.load_snapshot().unwrap().rules.len(), 1);
}

#[test]
fn csv_import_skips_duplicates() {
    let mut store = RuleStore::new();
    store.add_rule("youtube.com", None, BlockMode::Hard).unwrap();
    let csv = "domain,group,mode\n\
               https://www.YouTube.com/watch,Fun,friction_wait\n\
               reddit.com,Fun,friction_typing\n\
               reddit.com,Other,hard\n";
    let entries = parse_csv(csv).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(store.import_rules(entries), 1);

    let youtube = store.find_by_domain("youtube.com").unwrap();
    assert_eq!(youtube.mode, BlockMode::Hard);
    let reddit = store.find_by_domain("reddit.com").unwrap();
    assert_eq!(reddit.group, "Fun");
    assert!(store.group("fun").is_some());

    assert!(matches!(
        store.add_rule("www.reddit.com", None, BlockMode::Hard),
        Err(CoreError::DuplicateDomain { .. })
    ));
}

#[test]
fn overrides_survive_restart_until_expiry() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mb.db");
    let now = Utc::now();
    {
        let db = Database::open_at(&path).unwrap();
        let mut ledger = OverrideLedger::new();
        ledger.grant("www.youtube.com", Duration::minutes(10), now);
        db.save_overrides(&ledger, now).unwrap();
    }
    let db = Database::open_at(&path).unwrap();
    let ledger = db.load_overrides().unwrap();
    assert!(ledger.is_active("youtube.com", now + Duration::minutes(5)));
    assert!(!ledger.is_active("youtube.com", now + Duration::minutes(11)));
}
