//! SQLite-backed local storage.
//!
//! Provides persistent storage for:
//! - the rule document (rules and groups); this is the local rule repository
//! - the override ledger
//! - daily per-domain block/override counters
//! - a key-value store for application state

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::warn;

use super::{data_dir, migrations};
use crate::analytics::{AnalyticsSink, DailyStats, DomainCounts, ReportEvent, ReportKind};
use crate::domain::{is_valid_hostname, normalize};
use crate::error::{CoreError, DatabaseError, Result};
use crate::overrides::OverrideLedger;
use crate::rules::{BlockMode, Group, Rule, RuleSnapshot};
use crate::sync::{RuleRepository, Subscribers};

/// SQLite database at `~/.config/mindfulblock/mindfulblock.db`.
pub struct Database {
    conn: Connection,
    subscribers: Subscribers,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database in the data directory.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("mindfulblock.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)?;
        Ok(Self {
            conn,
            subscribers: Subscribers::default(),
        })
    }

    // ── Rules ────────────────────────────────────────────────────────

    /// Read the stored rule document.
    ///
    /// Rows whose mode no longer maps to a known mode are kept as
    /// `BlockMode::default()` with a warning, so the next save does not
    /// lose them.
    pub fn load_snapshot(&self) -> Result<RuleSnapshot> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, is_system FROM groups ORDER BY position, rowid")?;
        let groups = stmt
            .query_map([], |row| {
                Ok(Group {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    is_system: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT id, domain, group_name, mode, is_active, version
             FROM rules ORDER BY position, rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, u64>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut rules = Vec::with_capacity(rows.len());
        for (id, domain, group, mode, is_active, version) in rows {
            let mode = BlockMode::migrate(&mode).unwrap_or_else(|e| {
                warn!(%domain, error = %e, fallback = %BlockMode::default(), "unknown stored mode");
                BlockMode::default()
            });
            rules.push(Rule {
                id,
                domain,
                group,
                mode,
                is_active,
                version,
            });
        }

        Ok(RuleSnapshot { rules, groups })
    }

    /// Replace the stored rule document in one transaction.
    pub fn save_snapshot(&self, snapshot: &RuleSnapshot) -> Result<()> {
        snapshot.validate()?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM rules", [])?;
        tx.execute("DELETE FROM groups", [])?;
        {
            let mut insert_group = tx.prepare(
                "INSERT INTO groups (id, name, is_system, position) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (pos, g) in snapshot.groups.iter().enumerate() {
                insert_group.execute(params![g.id, g.name, g.is_system, pos as i64])?;
            }
            let mut insert_rule = tx.prepare(
                "INSERT INTO rules (id, domain, group_name, mode, is_active, version, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (pos, r) in snapshot.rules.iter().enumerate() {
                insert_rule.execute(params![
                    r.id,
                    r.domain,
                    r.group,
                    r.mode.as_str(),
                    r.is_active,
                    r.version as i64,
                    pos as i64,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ── Overrides ────────────────────────────────────────────────────

    pub fn load_overrides(&self) -> Result<OverrideLedger> {
        let mut stmt = self
            .conn
            .prepare("SELECT hostname, expires_at_ms FROM overrides")?;
        let entries = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(OverrideLedger::from_entries(entries))
    }

    /// Merge the unexpired entries of `ledger` into the stored ledger.
    ///
    /// Rows are upserted one at a time, keeping the later expiry, so grants
    /// written by another process since `ledger` was loaded survive. Only
    /// expired rows are removed.
    pub fn save_overrides(&self, ledger: &OverrideLedger, now: DateTime<Utc>) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM overrides WHERE expires_at_ms <= ?1",
            params![now.timestamp_millis()],
        )?;
        {
            let mut upsert = tx.prepare(
                "INSERT INTO overrides (hostname, expires_at_ms) VALUES (?1, ?2)
                 ON CONFLICT(hostname) DO UPDATE SET
                    expires_at_ms = MAX(expires_at_ms, excluded.expires_at_ms)",
            )?;
            for (host, expires_at_ms) in ledger.active(now) {
                upsert.execute(params![host, expires_at_ms])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ── Analytics ────────────────────────────────────────────────────

    pub fn record_report(&self, event: &ReportEvent, date: NaiveDate) -> Result<()> {
        let domain = normalize(&event.domain);
        if domain.is_empty() {
            return Err(CoreError::missing_field("domain"));
        }
        if !is_valid_hostname(&domain) {
            return Err(CoreError::invalid_hostname("domain", &domain));
        }
        let (blocked, overridden) = match event.kind {
            ReportKind::Block => (1, 0),
            ReportKind::Override => (0, 1),
        };
        self.conn.execute(
            "INSERT INTO domain_stats (date, domain, blocked, overridden)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(date, domain) DO UPDATE SET
                blocked = blocked + excluded.blocked,
                overridden = overridden + excluded.overridden",
            params![date.format("%Y-%m-%d").to_string(), domain, blocked, overridden],
        )?;
        Ok(())
    }

    pub fn daily_stats(&self, date: NaiveDate) -> Result<DailyStats> {
        let mut stmt = self.conn.prepare(
            "SELECT domain, blocked, overridden FROM domain_stats WHERE date = ?1",
        )?;
        let rows = stmt.query_map(params![date.format("%Y-%m-%d").to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                DomainCounts {
                    blocked: row.get(1)?,
                    overridden: row.get(2)?,
                },
            ))
        })?;

        let mut stats = DailyStats::new(date);
        for row in rows {
            let (domain, counts) = row?;
            stats.domains.insert(domain, counts);
        }
        Ok(stats)
    }

    // ── KV ───────────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        match stmt.query_row(params![key], |row| row.get::<_, String>(0)) {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl RuleRepository for Database {
    fn fetch(&self) -> Result<RuleSnapshot> {
        self.load_snapshot()
    }

    fn push(&self, snapshot: &RuleSnapshot) -> Result<()> {
        self.save_snapshot(snapshot)?;
        self.subscribers.publish(snapshot);
        Ok(())
    }

    fn subscribe(&self) -> UnboundedReceiver<RuleSnapshot> {
        self.subscribers.subscribe()
    }
}

/// Counts reports against today's UTC date; failures are logged only.
impl AnalyticsSink for Database {
    fn record(&self, event: &ReportEvent) {
        if let Err(e) = self.record_report(event, Utc::now().date_naive()) {
            warn!(domain = %event.domain, error = %e, "failed to record report");
        }
    }
}
