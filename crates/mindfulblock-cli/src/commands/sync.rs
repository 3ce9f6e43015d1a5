use chrono::Utc;
use clap::Subcommand;
use mindfulblock_core::{Config, Database, SyncBridge, SyncStatus};
use serde::Serialize;
use std::collections::BTreeSet;

use super::{hosts_sink, CliResult};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Repository reachability and whether the hosts file matches the rules
    Status {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct StatusReport {
    #[serde(flatten)]
    status: SyncStatus,
    hosts_path: String,
    expected: Vec<String>,
    applied: Vec<String>,
    in_sync: bool,
}

pub fn run(action: SyncAction) -> CliResult {
    match action {
        SyncAction::Status { json } => {
            let config = Config::load()?;
            let mut bridge = SyncBridge::new(Database::open()?, hosts_sink(&config));
            let (store, _) = bridge.load(Utc::now());

            let expected: BTreeSet<String> = if config.blocking.enabled {
                store.active_rules().map(|r| r.domain.clone()).collect()
            } else {
                BTreeSet::new()
            };
            let applied: BTreeSet<String> = bridge.sink().applied_domains()?.into_iter().collect();
            let report = StatusReport {
                status: bridge.status().clone(),
                hosts_path: bridge.sink().path().display().to_string(),
                in_sync: expected == applied,
                expected: expected.into_iter().collect(),
                applied: applied.into_iter().collect(),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let online = if report.status.is_online() { "online" } else { "offline" };
                println!("repository: {online}");
                println!("hosts file: {}", report.hosts_path);
                println!(
                    "enforcement: {} of {} rule(s) applied{}",
                    report.applied.len(),
                    report.expected.len(),
                    if report.in_sync { "" } else { " (out of date, run `mindfulblock apply`)" }
                );
            }
        }
    }
    Ok(())
}
