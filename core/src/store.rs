//! SQLite audit store.
//!
//! RULE: only store.rs talks to the database.
//! The table is created by the first append, never by a separate setup call.

use crate::{
    audit::{AuditRecord, AuditSink},
    error::{ScoreError, ScoreResult},
};
use rusqlite::{params, Connection};
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = include_str!("../../migrations/001_audit.sql");

pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    /// Open (or create) the audit database at `path`.
    pub fn open(path: &str) -> ScoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ScoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Rows recorded so far. 0 before the first append.
    pub fn row_count(&self) -> ScoreResult<i64> {
        let conn = self.conn();
        if !table_exists(&conn)? {
            return Ok(0);
        }
        let count = conn.query_row("SELECT COUNT(*) FROM decision_audit", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Labels in insertion order.
    pub fn labels(&self) -> ScoreResult<Vec<String>> {
        let conn = self.conn();
        if !table_exists(&conn)? {
            return Ok(Vec::new());
        }
        let mut stmt = conn.prepare("SELECT label FROM decision_audit ORDER BY id ASC")?;
        let labels = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(labels)
    }

    fn insert(conn: &Connection, record: &AuditRecord) -> rusqlite::Result<()> {
        conn.execute_batch(SCHEMA)?;
        conn.execute(
            "INSERT INTO decision_audit (
                step, type, amount, old_balance_origin, new_balance_origin,
                old_balance_dest, new_balance_dest, is_flagged, origin_account,
                destination_account, percent, label, logged_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                record.step as i64,
                record.txn_type,
                record.amount,
                record.old_balance_origin,
                record.new_balance_origin,
                record.old_balance_dest,
                record.new_balance_dest,
                record.is_flagged as i64,
                record.origin_account,
                record.destination_account,
                record.percent,
                record.label.as_str(),
                record.logged_at_iso(),
            ],
        )?;
        Ok(())
    }
}

impl AuditSink for SqliteAuditStore {
    fn append(&self, record: &AuditRecord) -> ScoreResult<()> {
        let conn = self.conn();
        Self::insert(&conn, record)
            .map_err(|e| ScoreError::LogWriteFailed(format!("sqlite: {e}")))
    }
}

fn table_exists(conn: &Connection) -> ScoreResult<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'decision_audit'",
        [],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}
