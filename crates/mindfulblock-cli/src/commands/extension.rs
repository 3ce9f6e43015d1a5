//! The browser extension's view of the world, driven from the terminal.

use chrono::Utc;
use clap::Subcommand;
use mindfulblock_core::extension::{CompanionClient, ReportClient, RuleCache, RulePoller};
use mindfulblock_core::{
    Config, InterceptState, Interceptor, NavigationEvent, OverrideLedger, ReportEvent, Verdict,
};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use super::CliResult;

#[derive(Subcommand)]
pub enum ExtensionAction {
    /// Fetch the rule list once from the companion endpoint
    Rules {
        /// Endpoint (overrides extension.server_url)
        #[arg(long)]
        server: Option<String>,
    },
    /// Evaluate a navigation against the fetched rules, reporting blocks
    Check {
        url: String,
        #[arg(long)]
        server: Option<String>,
    },
    /// Keep polling and print every rule list change
    Watch {
        #[arg(long)]
        server: Option<String>,
    },
}

fn client(config: &Config, server: Option<String>) -> mindfulblock_core::error::Result<CompanionClient> {
    CompanionClient::new(&server.unwrap_or_else(|| config.extension.server_url.clone()))
}

pub fn run(action: ExtensionAction) -> CliResult {
    let config = Config::load()?;
    let runtime = tokio::runtime::Runtime::new()?;
    let interval = Duration::from_secs(config.extension.poll_interval_secs.max(1));

    match action {
        ExtensionAction::Rules { server } => {
            let list = runtime.block_on(client(&config, server)?.fetch_rules())?;
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        ExtensionAction::Check { url, server } => {
            let client = client(&config, server)?;
            let cache = Arc::new(RwLock::new(RuleCache::new()));
            let poller = RulePoller::new(client.clone(), cache.clone(), interval);
            if !runtime.block_on(poller.poll_once()) {
                eprintln!("warning: companion unreachable; no rules known");
            }

            let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<ReportEvent>();
            let verdict = {
                let cache = cache.read().map_err(|_| "rule cache lock poisoned")?;
                let ledger = OverrideLedger::new();
                let state = InterceptState {
                    matcher: &*cache,
                    ledger: &ledger,
                    blocking_enabled: true,
                    language: cache.language(),
                };
                let (verdict, _) =
                    Interceptor::new(tx).handle(&NavigationEvent::main_frame(&url), &state, Utc::now());
                verdict
            };
            runtime.block_on(ReportClient::new(client).forward(rx));

            match verdict {
                Verdict::Allow { hostname, .. } => println!("allowed: {hostname}"),
                Verdict::Block(decision) => {
                    println!("blocked: {} [{}]", decision.hostname, decision.rule.mode);
                    println!("{}", decision.block_page.to_page_url());
                }
            }
        }
        ExtensionAction::Watch { server } => {
            let client = client(&config, server)?;
            let cache = Arc::new(RwLock::new(RuleCache::new()));
            let poller = RulePoller::new(client, cache.clone(), interval);
            runtime.block_on(async move {
                tokio::spawn(poller.run());
                let mut ticker = tokio::time::interval(interval);
                let mut last = None;
                loop {
                    ticker.tick().await;
                    let current = cache.read().ok().map(|c| c.rules().to_vec());
                    if current != last {
                        if let Some(rules) = &current {
                            println!("{} rule(s):", rules.len());
                            for r in rules {
                                println!("  {:<32} {}", r.domain, r.mode);
                            }
                        }
                        last = current;
                    }
                }
            });
        }
    }
    Ok(())
}
