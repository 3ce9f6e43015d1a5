use clap::Subcommand;
use mindfulblock_core::friction::DestructiveAction;

use super::{require_confirmation, CliResult, Session};

#[derive(Subcommand)]
pub enum GroupAction {
    /// List groups with rule counts
    List {
        #[arg(long)]
        json: bool,
    },
    /// Create a group
    Create { name: String },
    /// Delete a group and every rule in it (requires the confirmation sentence)
    Delete {
        name: String,
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Disable every rule in a group (requires the confirmation sentence)
    Disable {
        name: String,
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Enable every rule in a group
    Enable { name: String },
}

pub fn run(action: GroupAction) -> CliResult {
    let mut session = Session::open()?;

    match action {
        GroupAction::List { json } => {
            let summaries = session.store.group_summaries();
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                for s in summaries {
                    let system = if s.group.is_system { " (system)" } else { "" };
                    println!(
                        "{:<24} {} rule(s), {} active{system}",
                        s.group.name, s.rule_count, s.active_count
                    );
                }
            }
        }
        GroupAction::Create { name } => {
            let group = session.store.create_group(&name)?;
            session.commit()?;
            println!("Group: {}", group.name);
        }
        GroupAction::Delete { name, confirm } => {
            let group = session
                .store
                .group(&name)
                .map(|g| g.name.clone())
                .ok_or_else(|| format!("no group named '{name}'"))?;
            require_confirmation(
                DestructiveAction::DeleteGroup { name: group.clone() },
                &session.config,
                confirm.as_deref(),
            )?;
            let removed = session
                .store
                .delete_group(&group)
                .ok_or_else(|| format!("group '{group}' cannot be deleted"))?;
            session.commit()?;
            println!("Group deleted: {group} ({removed} rule(s) removed)");
        }
        GroupAction::Disable { name, confirm } => {
            let group = session
                .store
                .group(&name)
                .map(|g| g.name.clone())
                .ok_or_else(|| format!("no group named '{name}'"))?;
            require_confirmation(
                DestructiveAction::DisableGroup { name: group.clone() },
                &session.config,
                confirm.as_deref(),
            )?;
            let changed = session.store.set_group_active(&group, false)?;
            session.commit()?;
            println!("Group disabled: {group} ({changed} rule(s) changed)");
        }
        GroupAction::Enable { name } => {
            let changed = session.store.set_group_active(&name, true)?;
            session.commit()?;
            println!("Group enabled: {name} ({changed} rule(s) changed)");
        }
    }
    Ok(())
}
