pub mod check;
pub mod config;
pub mod enforce;
pub mod extension;
pub mod group;
pub mod overrides;
pub mod preset;
pub mod rule;
pub mod serve;
pub mod stats;
pub mod sync;

use chrono::Utc;
use mindfulblock_core::friction::{ConfirmationPrompt, DestructiveAction, InputMethod};
use mindfulblock_core::{
    ApplySettings, Config, Database, Event, HostsFileSink, RuleStore, SyncBridge,
};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

pub type Bridge = SyncBridge<Database, HostsFileSink>;

/// Hosts sink for the configured path, or the platform default.
pub fn hosts_sink(config: &Config) -> HostsFileSink {
    match &config.enforcement.hosts_path {
        Some(path) if !path.is_empty() => HostsFileSink::at(path),
        _ => HostsFileSink::system(),
    }
}

pub fn apply_settings(config: &Config) -> ApplySettings {
    ApplySettings {
        blocking_enabled: config.blocking.enabled,
        language: config.language,
    }
}

/// Everything a rule-editing command needs.
pub struct Session {
    pub config: Config,
    pub bridge: Bridge,
    pub store: RuleStore,
}

impl Session {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let db = Database::open()?;
        let mut bridge = SyncBridge::new(db, hosts_sink(&config));
        let (store, _) = bridge.load(Utc::now());
        if let mindfulblock_core::sync::Connectivity::Offline { reason } = &bridge.status().connectivity {
            return Err(format!("cannot read rules: {reason}").into());
        }
        Ok(Self {
            config,
            bridge,
            store,
        })
    }

    /// Persist the store and push it to the hosts file.
    ///
    /// Enforcement problems are reported on stderr; the change itself is
    /// kept.
    pub fn commit(&mut self) -> CliResult {
        let events = self
            .bridge
            .push_local(&self.store, apply_settings(&self.config), Utc::now())?;
        report_events(&events);
        Ok(())
    }

    /// Resolve a rule id or a domain to a rule id.
    pub fn resolve(&self, target: &str) -> Result<String, Box<dyn std::error::Error>> {
        if let Some(rule) = self.store.get(target) {
            return Ok(rule.id.clone());
        }
        self.store
            .find_by_domain(target)
            .map(|r| r.id.clone())
            .ok_or_else(|| format!("no rule for '{target}'").into())
    }

    pub fn resolve_all(&self, targets: &[String]) -> Result<Vec<String>, Box<dyn std::error::Error>> {
        targets.iter().map(|t| self.resolve(t)).collect()
    }
}

pub fn report_events(events: &[Event]) {
    for event in events {
        match event {
            Event::EnforcementFailed {
                admin_required: true,
                ..
            } => eprintln!(
                "warning: rules saved, but the hosts file needs administrator privileges; rerun `mindfulblock apply` as admin"
            ),
            Event::EnforcementFailed { message, .. } => {
                eprintln!("warning: rules saved, but applying them failed: {message}")
            }
            Event::RepositoryOffline { message, .. } => {
                eprintln!("warning: rule repository offline: {message}")
            }
            _ => {}
        }
    }
}

/// Require the exact confirmation sentence for a destructive action.
pub fn require_confirmation(
    action: DestructiveAction,
    config: &Config,
    typed: Option<&str>,
) -> CliResult {
    let mut prompt = ConfirmationPrompt::new(action, config.language);
    if let Some(text) = typed {
        prompt.set_input(text, InputMethod::Typed);
    }
    if prompt.can_confirm() {
        Ok(())
    } else {
        Err(format!("confirmation required: pass --confirm \"{}\"", prompt.sentence()).into())
    }
}
