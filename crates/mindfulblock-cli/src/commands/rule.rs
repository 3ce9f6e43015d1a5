use clap::Subcommand;
use mindfulblock_core::friction::DestructiveAction;
use mindfulblock_core::rules::parse_csv;
use mindfulblock_core::BlockMode;

use super::{require_confirmation, CliResult, Session};

pub fn parse_mode(s: &str) -> Result<BlockMode, String> {
    BlockMode::migrate(s).map_err(|e| e.to_string())
}

#[derive(Subcommand)]
pub enum RuleAction {
    /// Add a blocking rule
    Add {
        /// Domain or URL to block
        domain: String,
        /// Group name (created if missing)
        #[arg(long)]
        group: Option<String>,
        /// hard, friction_math, friction_wait or friction_typing
        #[arg(long, default_value = "hard", value_parser = parse_mode)]
        mode: BlockMode,
    },
    /// List rules
    List {
        /// Only rules in this group
        #[arg(long)]
        group: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-enable rules
    Enable {
        /// Rule ids or domains
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// Disable a rule (requires the confirmation sentence)
    Disable {
        /// Rule id or domain
        target: String,
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Delete a rule (requires the confirmation sentence)
    Delete {
        /// Rule id or domain
        target: String,
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Change the mode of one or more rules
    Mode {
        #[arg(value_parser = parse_mode)]
        mode: BlockMode,
        /// Rule ids or domains
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// Move one or more rules to a group
    Move {
        group: String,
        /// Rule ids or domains
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// Import rules from a Domain,Group,Mode CSV file
    Import {
        path: std::path::PathBuf,
    },
}

pub fn run(action: RuleAction) -> CliResult {
    let mut session = Session::open()?;

    match action {
        RuleAction::Add { domain, group, mode } => {
            let rule = session.store.add_rule(&domain, group.as_deref(), mode)?;
            session.commit()?;
            println!("Rule added: {} [{}] ({})", rule.domain, rule.mode, rule.group);
            println!("ID: {}", rule.id);
        }
        RuleAction::List { group, json } => {
            let rules: Vec<_> = match &group {
                Some(name) => session.store.rules_in_group(name).collect(),
                None => session.store.rules().iter().collect(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&rules)?);
            } else if rules.is_empty() {
                println!("No rules.");
            } else {
                for rule in rules {
                    let state = if rule.is_active { "on " } else { "off" };
                    println!(
                        "{state}  {:<32} {:<16} {:<16} {}",
                        rule.domain, rule.mode, rule.group, rule.id
                    );
                }
            }
        }
        RuleAction::Enable { targets } => {
            let ids = session.resolve_all(&targets)?;
            session.store.set_rules_active(&ids, true)?;
            session.commit()?;
            println!("Enabled {} rule(s)", ids.len());
        }
        RuleAction::Disable { target, confirm } => {
            let id = session.resolve(&target)?;
            let domain = domain_of(&session, &id);
            require_confirmation(
                DestructiveAction::DisableRule { domain: domain.clone() },
                &session.config,
                confirm.as_deref(),
            )?;
            session.store.set_active(&id, false)?;
            session.commit()?;
            println!("Rule disabled: {domain}");
        }
        RuleAction::Delete { target, confirm } => {
            let id = session.resolve(&target)?;
            let domain = domain_of(&session, &id);
            require_confirmation(
                DestructiveAction::DeleteRule { domain },
                &session.config,
                confirm.as_deref(),
            )?;
            let rule = session.store.delete_rule(&id)?;
            session.commit()?;
            println!("Rule deleted: {}", rule.domain);
        }
        RuleAction::Mode { mode, targets } => {
            let ids = session.resolve_all(&targets)?;
            session.store.update_modes(&ids, mode)?;
            session.commit()?;
            println!("{} rule(s) set to {mode}", ids.len());
        }
        RuleAction::Move { group, targets } => {
            let ids = session.resolve_all(&targets)?;
            session.store.move_rules_to_group(&ids, &group)?;
            session.commit()?;
            println!("{} rule(s) moved to {group}", ids.len());
        }
        RuleAction::Import { path } => {
            let text = std::fs::read_to_string(&path)?;
            let entries = parse_csv(&text)?;
            let total = entries.len();
            let added = session.store.import_rules(entries);
            session.commit()?;
            println!("Imported {added} of {total} rule(s); {} skipped", total - added);
        }
    }
    Ok(())
}

fn domain_of(session: &Session, id: &str) -> String {
    session
        .store
        .get(id)
        .map(|r| r.domain.clone())
        .unwrap_or_default()
}
