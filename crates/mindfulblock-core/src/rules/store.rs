//! In-memory rule store.
//!
//! One `RuleStore` is constructed at start-up and handed to whoever needs
//! it; there is no global instance. Every mutation goes through a method
//! here so the invariants hold at all times:
//!
//! - rule domains are normalized and unique
//! - a system group named `General` always exists
//! - group names are unique case-insensitively
//!
//! Batch operations validate every id before touching anything, so a
//! caller either sees the whole batch applied or an error and no change.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::matcher::{most_specific, RuleMatch, RuleMatcher};
use super::mode::BlockMode;
use crate::domain::{is_valid_hostname, normalize};
use crate::error::{CoreError, Result};

/// Name of the group that always exists and cannot be deleted.
pub const DEFAULT_GROUP: &str = "General";

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}
fn default_true() -> bool {
    true
}
fn default_version() -> u64 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub domain: String,
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default)]
    pub mode: BlockMode,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_version", alias = "v")]
    pub version: u64,
}

impl Rule {
    fn touch(&mut self) {
        self.version += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_system: bool,
}

impl Group {
    fn general() -> Self {
        Self {
            id: "general".to_string(),
            name: DEFAULT_GROUP.to_string(),
            is_system: true,
        }
    }

    fn named(name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            is_system: false,
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        group_key(&self.name) == group_key(name)
    }
}

/// Comparison key for group names: trimmed and lowercased with full
/// Unicode case folding, so `Mạng xã hội` and `MẠNG XÃ HỘI` are one group.
pub fn group_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A group together with how many rules reference it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    #[serde(flatten)]
    pub group: Group,
    pub rule_count: usize,
    pub active_count: usize,
}

/// Full rule state as exchanged with a repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSnapshot {
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl RuleSnapshot {
    /// Reject snapshots with missing required fields before they are
    /// written anywhere.
    pub fn validate(&self) -> Result<()> {
        for rule in &self.rules {
            if rule.id.trim().is_empty() {
                return Err(CoreError::missing_field("rule.id"));
            }
            if rule.domain.trim().is_empty() {
                return Err(CoreError::missing_field("rule.domain"));
            }
            if !is_valid_hostname(&normalize(&rule.domain)) {
                return Err(CoreError::invalid_hostname("rule.domain", &rule.domain));
            }
            if rule.group.trim().is_empty() {
                return Err(CoreError::missing_field("rule.group"));
            }
        }
        for group in &self.groups {
            if group.id.trim().is_empty() {
                return Err(CoreError::missing_field("group.id"));
            }
            if group.name.trim().is_empty() {
                return Err(CoreError::missing_field("group.name"));
            }
        }
        Ok(())
    }
}

/// One entry of a bulk import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    pub domain: String,
    pub group: Option<String>,
    pub mode: BlockMode,
}

#[derive(Debug, Clone)]
pub struct RuleStore {
    rules: Vec<Rule>,
    groups: Vec<Group>,
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleStore {
    /// Empty store holding only the `General` group.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            groups: vec![Group::general()],
        }
    }

    /// Rebuild a store from a repository snapshot.
    ///
    /// Domains are re-normalized, rules whose domain is not a valid
    /// hostname and later duplicates are dropped, rules
    /// pointing at unknown groups get their group created, and `General`
    /// is restored if the snapshot lacks it.
    pub fn from_snapshot(snapshot: RuleSnapshot) -> Self {
        let mut store = Self {
            rules: Vec::with_capacity(snapshot.rules.len()),
            groups: Vec::with_capacity(snapshot.groups.len() + 1),
        };

        for group in snapshot.groups {
            if group.name.trim().is_empty() || store.group(&group.name).is_some() {
                continue;
            }
            store.groups.push(group);
        }
        match store.groups.iter_mut().find(|g| g.is_named(DEFAULT_GROUP)) {
            Some(general) => general.is_system = true,
            None => store.groups.insert(0, Group::general()),
        }

        for mut rule in snapshot.rules {
            rule.domain = normalize(&rule.domain);
            if !is_valid_hostname(&rule.domain) {
                if !rule.domain.is_empty() {
                    warn!(domain = ?rule.domain, "dropping rule with invalid domain from snapshot");
                }
                continue;
            }
            if store.find_by_domain(&rule.domain).is_some() {
                warn!(domain = %rule.domain, "dropping duplicate rule from snapshot");
                continue;
            }
            rule.group = store.ensure_group(&rule.group);
            store.rules.push(rule);
        }
        store
    }

    pub fn snapshot(&self) -> RuleSnapshot {
        RuleSnapshot {
            rules: self.rules.clone(),
            groups: self.groups.clone(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn active_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.is_active)
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Exact lookup by domain (input is normalized first).
    pub fn find_by_domain(&self, domain: &str) -> Option<&Rule> {
        let domain = normalize(domain);
        self.rules.iter().find(|r| r.domain == domain)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.is_named(name))
    }

    pub fn rules_in_group(&self, name: &str) -> impl Iterator<Item = &Rule> {
        let key = group_key(name);
        self.rules.iter().filter(move |r| group_key(&r.group) == key)
    }

    pub fn group_summaries(&self) -> Vec<GroupSummary> {
        self.groups
            .iter()
            .map(|g| {
                let rules: Vec<&Rule> = self.rules_in_group(&g.name).collect();
                GroupSummary {
                    group: g.clone(),
                    rule_count: rules.len(),
                    active_count: rules.iter().filter(|r| r.is_active).count(),
                }
            })
            .collect()
    }

    // ── Rule mutations ───────────────────────────────────────────────

    /// Add a rule. The domain is normalized; the group is created if absent.
    ///
    /// # Errors
    /// `DuplicateDomain` if a rule for the exact normalized domain exists,
    /// `SchemaValidation` if the domain normalizes to nothing or to
    /// something that is not a hostname.
    pub fn add_rule(&mut self, domain: &str, group: Option<&str>, mode: BlockMode) -> Result<Rule> {
        let domain = normalize(domain);
        if domain.is_empty() {
            return Err(CoreError::missing_field("domain"));
        }
        if !is_valid_hostname(&domain) {
            return Err(CoreError::invalid_hostname("domain", &domain));
        }
        if self.find_by_domain(&domain).is_some() {
            return Err(CoreError::DuplicateDomain { domain });
        }

        let group = self.ensure_group(group.unwrap_or(DEFAULT_GROUP));
        let rule = Rule {
            id: Uuid::new_v4().to_string(),
            domain,
            group,
            mode,
            is_active: true,
            version: 1,
        };
        info!(domain = %rule.domain, group = %rule.group, mode = %rule.mode, "rule added");
        self.rules.push(rule.clone());
        Ok(rule)
    }

    /// Bulk add. Entries whose domain already exists, in the store or
    /// earlier in the same batch, are skipped. Returns how many were added.
    pub fn import_rules<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = ImportEntry>,
    {
        let mut imported = 0;
        for entry in entries {
            match self.add_rule(&entry.domain, entry.group.as_deref(), entry.mode) {
                Ok(_) => imported += 1,
                Err(e) => debug!(domain = %entry.domain, error = %e, "import entry skipped"),
            }
        }
        info!(imported, "rules imported");
        imported
    }

    /// Flip a rule's active flag, returning the new state.
    pub fn toggle_rule(&mut self, id: &str) -> Result<bool> {
        let rule = self.rule_mut(id)?;
        rule.is_active = !rule.is_active;
        rule.touch();
        Ok(rule.is_active)
    }

    pub fn set_active(&mut self, id: &str, active: bool) -> Result<()> {
        let rule = self.rule_mut(id)?;
        if rule.is_active != active {
            rule.is_active = active;
            rule.touch();
        }
        Ok(())
    }

    pub fn delete_rule(&mut self, id: &str) -> Result<Rule> {
        let idx = self
            .rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| CoreError::RuleNotFound(id.to_string()))?;
        let rule = self.rules.remove(idx);
        info!(domain = %rule.domain, "rule deleted");
        Ok(rule)
    }

    pub fn update_mode(&mut self, id: &str, mode: BlockMode) -> Result<()> {
        let rule = self.rule_mut(id)?;
        if rule.mode != mode {
            rule.mode = mode;
            rule.touch();
        }
        Ok(())
    }

    pub fn move_to_group(&mut self, id: &str, group_name: &str) -> Result<()> {
        self.rule_mut(id)?;
        let group = self.ensure_group(group_name);
        let rule = self.rule_mut(id)?;
        if rule.group != group {
            rule.group = group;
            rule.touch();
        }
        Ok(())
    }

    // ── Batch variants ───────────────────────────────────────────────

    pub fn toggle_rules(&mut self, ids: &[String]) -> Result<()> {
        for id in self.checked_ids(ids)? {
            self.toggle_rule(&id)?;
        }
        Ok(())
    }

    pub fn set_rules_active(&mut self, ids: &[String], active: bool) -> Result<()> {
        for id in self.checked_ids(ids)? {
            self.set_active(&id, active)?;
        }
        Ok(())
    }

    pub fn delete_rules(&mut self, ids: &[String]) -> Result<Vec<Rule>> {
        let ids = self.checked_ids(ids)?;
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            removed.push(self.delete_rule(&id)?);
        }
        Ok(removed)
    }

    pub fn update_modes(&mut self, ids: &[String], mode: BlockMode) -> Result<()> {
        for id in self.checked_ids(ids)? {
            self.update_mode(&id, mode)?;
        }
        Ok(())
    }

    pub fn move_rules_to_group(&mut self, ids: &[String], group_name: &str) -> Result<()> {
        let ids = self.checked_ids(ids)?;
        if group_name.trim().is_empty() {
            return Err(CoreError::missing_field("group"));
        }
        for id in ids {
            self.move_to_group(&id, group_name)?;
        }
        Ok(())
    }

    // ── Groups ───────────────────────────────────────────────────────

    /// Create a group, or return the existing one with the same name.
    pub fn create_group(&mut self, name: &str) -> Result<Group> {
        if name.trim().is_empty() {
            return Err(CoreError::missing_field("group.name"));
        }
        let name = self.ensure_group(name);
        self.group(&name)
            .cloned()
            .ok_or(CoreError::GroupNotFound(name))
    }

    /// Delete a non-system group and every rule in it.
    ///
    /// Returns `None` (and changes nothing) for `General`, any system
    /// group, or an unknown name; otherwise the number of rules removed.
    pub fn delete_group(&mut self, name: &str) -> Option<usize> {
        let idx = self.groups.iter().position(|g| g.is_named(name))?;
        let group = &self.groups[idx];
        if group.is_system || group.is_named(DEFAULT_GROUP) {
            debug!(group = %group.name, "refusing to delete system group");
            return None;
        }
        let group = self.groups.remove(idx);
        let key = group_key(&group.name);
        let before = self.rules.len();
        self.rules.retain(|r| group_key(&r.group) != key);
        let removed = before - self.rules.len();
        info!(group = %group.name, removed, "group deleted");
        Some(removed)
    }

    /// Enable or disable every rule in a group. Returns how many changed.
    pub fn set_group_active(&mut self, name: &str, active: bool) -> Result<usize> {
        let key = self
            .group(name)
            .map(|g| group_key(&g.name))
            .ok_or_else(|| CoreError::GroupNotFound(name.to_string()))?;
        let mut changed = 0;
        for rule in self.rules.iter_mut().filter(|r| group_key(&r.group) == key) {
            if rule.is_active != active {
                rule.is_active = active;
                rule.touch();
                changed += 1;
            }
        }
        Ok(changed)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn rule_mut(&mut self, id: &str) -> Result<&mut Rule> {
        self.rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CoreError::RuleNotFound(id.to_string()))
    }

    /// Verify every id exists; return them de-duplicated in input order.
    fn checked_ids(&self, ids: &[String]) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if self.get(id).is_none() {
                return Err(CoreError::RuleNotFound(id.clone()));
            }
            if seen.insert(id.as_str()) {
                out.push(id.clone());
            }
        }
        Ok(out)
    }

    /// Return the canonical spelling of `name`, creating the group if needed.
    fn ensure_group(&mut self, name: &str) -> String {
        let name = name.trim();
        let name = if name.is_empty() { DEFAULT_GROUP } else { name };
        if let Some(existing) = self.group(name) {
            return existing.name.clone();
        }
        let group = Group::named(name);
        let canonical = group.name.clone();
        self.groups.push(group);
        canonical
    }
}

impl RuleMatcher for RuleStore {
    fn match_host(&self, hostname: &str) -> Option<RuleMatch> {
        most_specific(hostname, self.active_rules(), |r| r.domain.as_str()).map(|r| RuleMatch {
            rule_id: Some(r.id.clone()),
            domain: r.domain.clone(),
            mode: r.mode,
        })
    }
}
