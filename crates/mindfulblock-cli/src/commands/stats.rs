use chrono::{NaiveDate, Utc};
use clap::Args;
use mindfulblock_core::Database;

use super::CliResult;

#[derive(Args)]
pub struct StatsArgs {
    /// Day to report (YYYY-MM-DD, UTC); defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: StatsArgs) -> CliResult {
    let db = Database::open()?;
    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
    let summary = db.daily_stats(date)?.summary();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!("{}", summary.date);
    println!("  blocked:    {}", summary.total_blocked);
    println!("  overrides:  {}", summary.total_overrides);
    println!("  time saved: {} min", summary.time_saved_minutes);
    for (domain, counts) in &summary.top_domains {
        println!("  {domain:<32} {} blocked, {} overridden", counts.blocked, counts.overridden);
    }
    Ok(())
}
