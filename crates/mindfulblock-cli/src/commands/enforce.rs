use chrono::Utc;
use mindfulblock_core::{Config, Database, Event, SyncBridge};

use super::{apply_settings, hosts_sink, report_events, CliResult};

/// Write the current rules to the hosts file.
pub fn run_apply() -> CliResult {
    let config = Config::load()?;
    let mut bridge = SyncBridge::new(Database::open()?, hosts_sink(&config));
    let now = Utc::now();
    let (store, events) = bridge.load(now);
    report_events(&events);
    if !bridge.status().is_online() {
        return Err("cannot read rules; hosts file left unchanged".into());
    }

    match bridge.apply(&store, apply_settings(&config), now) {
        Event::RulesApplied { active_rules, .. } => {
            println!("Applied {active_rules} rule(s) to {}", bridge.sink().path().display());
            Ok(())
        }
        Event::EnforcementFailed { message, .. } => Err(message.into()),
        _ => Ok(()),
    }
}

/// Remove the managed section from the hosts file.
pub fn run_clean() -> CliResult {
    let config = Config::load()?;
    let mut bridge = SyncBridge::new(Database::open()?, hosts_sink(&config));
    bridge.clean()?;
    println!("Removed MindfulBlock entries from {}", bridge.sink().path().display());
    Ok(())
}
