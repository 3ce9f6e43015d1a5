use chrono::{TimeZone, Utc};
use clap::Args;
use mindfulblock_core::friction::ChallengeKind;
use mindfulblock_core::interceptor::AllowReason;
use mindfulblock_core::{
    evaluate, ChallengeOutcome, Config, Database, FrictionEngine, InterceptState, Interceptor,
    NavigationEvent, RuleStore, Verdict,
};
use std::io::{BufRead, Write};

use super::CliResult;

#[derive(Args)]
pub struct CheckArgs {
    /// URL or hostname to test
    pub url: String,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct NavigateArgs {
    /// URL to open
    pub url: String,
    /// Seed for reproducible challenges
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Dry run: what would happen to a navigation. Nothing is recorded.
pub fn run_check(args: CheckArgs) -> CliResult {
    let config = Config::load()?;
    let db = Database::open()?;
    let store = RuleStore::from_snapshot(db.load_snapshot()?);
    let ledger = db.load_overrides()?;
    let state = InterceptState {
        matcher: &store,
        ledger: &ledger,
        blocking_enabled: config.blocking.enabled,
        language: config.language,
    };
    let verdict = evaluate(&NavigationEvent::main_frame(&args.url), &state, Utc::now());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }
    match verdict {
        Verdict::Allow { hostname, reason } => match reason {
            AllowReason::OverrideActive { remaining_ms } => {
                println!("allowed: {hostname} (override, {}s left)", remaining_ms / 1000)
            }
            AllowReason::BlockingDisabled => println!("allowed: {hostname} (blocking is off)"),
            AllowReason::NoMatchingRule | AllowReason::NotMainFrame => {
                println!("allowed: {hostname}")
            }
        },
        Verdict::Block(decision) => {
            println!(
                "blocked: {} by rule {} [{}]",
                decision.hostname, decision.rule.domain, decision.rule.mode
            );
            println!("block page: {}", decision.block_page.to_page_url());
        }
    }
    Ok(())
}

/// Simulate a browser navigation, running the challenge on stdin.
pub fn run_navigate(args: NavigateArgs) -> CliResult {
    let config = Config::load()?;
    let db = Database::open()?;
    let store = RuleStore::from_snapshot(db.load_snapshot()?);
    let mut ledger = db.load_overrides()?;
    let now = Utc::now();

    let interceptor = Interceptor::new(&db);
    let state = InterceptState {
        matcher: &store,
        ledger: &ledger,
        blocking_enabled: config.blocking.enabled,
        language: config.language,
    };
    let (verdict, _) = interceptor.handle(&NavigationEvent::main_frame(&args.url), &state, now);
    let decision = match verdict {
        Verdict::Allow { hostname, .. } => {
            println!("allowed: {hostname}");
            return Ok(());
        }
        Verdict::Block(decision) => decision,
    };

    let mut engine = FrictionEngine::new(args.seed);
    let (mut challenge, _) = engine.start(&decision, now);
    println!("blocked: {} [{}]", decision.hostname, decision.rule.mode);
    println!("{}", challenge.prompt());
    if !decision.overridable() {
        return Ok(());
    }

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        let answer = match &challenge.kind {
            ChallengeKind::Wait { .. } => {
                let remaining = challenge.remaining_wait_ms(Utc::now());
                if remaining > 0 {
                    std::thread::sleep(std::time::Duration::from_millis(remaining as u64));
                }
                String::new()
            }
            _ => {
                print!("> ");
                std::io::stdout().flush()?;
                match lines.next() {
                    Some(line) => line?,
                    None => {
                        println!("cancelled");
                        return Ok(());
                    }
                }
            }
        };

        let (outcome, _) = engine.submit(&mut challenge, &answer, &mut ledger, &db, Utc::now());
        match outcome {
            ChallengeOutcome::Unlocked {
                navigate_to,
                expires_at_ms,
            } => {
                db.save_overrides(&ledger, Utc::now())?;
                let until = Utc
                    .timestamp_millis_opt(expires_at_ms)
                    .single()
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default();
                println!("unlocked: {navigate_to}");
                println!("override for {} until {until}", challenge.hostname);
                return Ok(());
            }
            ChallengeOutcome::Retry { attempts } => {
                println!("wrong answer ({attempts}), try again");
            }
            ChallengeOutcome::Waiting { remaining_ms } => {
                println!("wait {}s more", (remaining_ms + 999) / 1000);
            }
            ChallengeOutcome::Denied => return Ok(()),
        }
    }
}
