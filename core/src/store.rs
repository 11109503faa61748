//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The manager calls store methods — it never executes SQL directly.

use rusqlite::{params, Connection, OptionalExtension};

use crate::{
    error::EntitlementResult,
    record::{EntitlementState, SubscriptionRecord},
    types::TimestampMs,
};

/// One line of the bounded transition log: when the externally visible
/// state changed and what it changed between.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionLogEntry {
    pub id: Option<i64>,
    pub at_utc: TimestampMs,
    pub from_state: EntitlementState,
    pub to_state: EntitlementState,
}

impl std::fmt::Display for TransitionLogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let when = chrono::DateTime::from_timestamp_millis(self.at_utc)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| self.at_utc.to_string());
        write!(f, "{when}  {} -> {}", self.from_state, self.to_state)
    }
}

pub struct EntitlementStore {
    conn: Connection,
}

impl EntitlementStore {
    /// Open (or create) the entitlement database at `path`.
    pub fn open(path: &str) -> EntitlementResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> EntitlementResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> EntitlementResult<()> {
        self.conn
            .execute_batch(include_str!("../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Subscription record (single slot) ──────────────────────

    /// Read the record, if one has ever been written.
    pub fn read_record(&self) -> EntitlementResult<Option<SubscriptionRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT purchase_start_utc, last_known_expiry_utc, last_verification_utc,
                        system_elapsed_at_verification, purchase_token, entitlement_state,
                        survival_mode_activated_at_utc, clock_suspicious, auto_renewing
                 FROM subscription_record WHERE slot = 0",
                [],
                |row| {
                    Ok(SubscriptionRecord {
                        purchase_start_utc: row.get(0)?,
                        last_known_expiry_utc: row.get(1)?,
                        last_verification_utc: row.get(2)?,
                        system_elapsed_realtime_at_verification: row.get(3)?,
                        purchase_token: row.get(4)?,
                        entitlement_state: EntitlementState::parse(&row.get::<_, String>(5)?),
                        survival_mode_activated_at_utc: row.get(6)?,
                        clock_suspicious: row.get(7)?,
                        auto_renewing: row.get(8)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Overwrite the single record slot in place.
    pub fn write_record(&self, record: &SubscriptionRecord) -> EntitlementResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO subscription_record
                 (slot, purchase_start_utc, last_known_expiry_utc, last_verification_utc,
                  system_elapsed_at_verification, purchase_token, entitlement_state,
                  survival_mode_activated_at_utc, clock_suspicious, auto_renewing)
             VALUES (0, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.purchase_start_utc,
                record.last_known_expiry_utc,
                record.last_verification_utc,
                record.system_elapsed_realtime_at_verification,
                record.purchase_token,
                record.entitlement_state.as_str(),
                record.survival_mode_activated_at_utc,
                record.clock_suspicious,
                record.auto_renewing,
            ],
        )?;
        Ok(())
    }

    // ── Transition log ─────────────────────────────────────────

    /// Append one transition and trim the log to the newest `cap` entries.
    pub fn append_transition(
        &self,
        entry: &TransitionLogEntry,
        cap: usize,
    ) -> EntitlementResult<()> {
        self.conn.execute(
            "INSERT INTO transition_log (at_utc, from_state, to_state) VALUES (?1, ?2, ?3)",
            params![
                entry.at_utc,
                entry.from_state.as_str(),
                entry.to_state.as_str()
            ],
        )?;
        self.conn.execute(
            "DELETE FROM transition_log WHERE id NOT IN
                 (SELECT id FROM transition_log ORDER BY id DESC LIMIT ?1)",
            params![cap as i64],
        )?;
        Ok(())
    }

    /// All retained transitions, oldest first.
    pub fn transitions(&self) -> EntitlementResult<Vec<TransitionLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, at_utc, from_state, to_state FROM transition_log ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(TransitionLogEntry {
                    id: Some(row.get(0)?),
                    at_utc: row.get(1)?,
                    from_state: EntitlementState::parse(&row.get::<_, String>(2)?),
                    to_state: EntitlementState::parse(&row.get::<_, String>(3)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Meta ───────────────────────────────────────────────────

    pub fn get_meta(&self, key: &str) -> EntitlementResult<Option<i64>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_meta(&self, key: &str, value: i64) -> EntitlementResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}
