use clap::Subcommand;
use mindfulblock_core::rules::{presets, PRESETS};
use mindfulblock_core::BlockMode;

use super::rule::parse_mode;
use super::{CliResult, Session};

#[derive(Subcommand)]
pub enum PresetAction {
    /// List built-in presets
    List {
        #[arg(long)]
        json: bool,
    },
    /// Import every domain of a preset
    Apply {
        /// Preset id (see `preset list`)
        id: String,
        #[arg(long, default_value = "friction_math", value_parser = parse_mode)]
        mode: BlockMode,
    },
}

pub fn run(action: PresetAction) -> CliResult {
    match action {
        PresetAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(PRESETS)?);
            } else {
                for p in PRESETS {
                    println!("{:<14} {:<26} {} domain(s)", p.id, p.name, p.domains.len());
                }
            }
        }
        PresetAction::Apply { id, mode } => {
            let preset = presets::find(&id).ok_or_else(|| format!("unknown preset '{id}'"))?;
            let mut session = Session::open()?;
            let added = session.store.import_rules(preset.entries(mode));
            session.commit()?;
            println!(
                "Preset {}: {added} rule(s) added to {}",
                preset.id, preset.group
            );
        }
    }
    Ok(())
}
