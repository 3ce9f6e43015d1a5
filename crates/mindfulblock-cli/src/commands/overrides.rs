use chrono::Utc;
use clap::Subcommand;
use mindfulblock_core::Database;

use super::CliResult;

#[derive(Subcommand)]
pub enum OverrideAction {
    /// List hosts with a live override
    Status {
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: OverrideAction) -> CliResult {
    let db = Database::open()?;
    let mut ledger = db.load_overrides()?;
    let now = Utc::now();
    ledger.prune(now);

    match action {
        OverrideAction::Status { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&ledger)?);
            } else if ledger.is_empty() {
                println!("No active overrides.");
            } else {
                for (host, _) in ledger.active(now) {
                    let secs = ledger.remaining_ms(host, now) / 1000;
                    println!("{host:<32} {}m{:02}s left", secs / 60, secs % 60);
                }
            }
        }
    }
    Ok(())
}
