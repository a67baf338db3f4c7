// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit trail: append-only SQLite log of every certificate issued.
//
// Schema:
//   certificate_audit(
//     id                 INTEGER PRIMARY KEY AUTOINCREMENT,
//     timestamp          TEXT    NOT NULL,   -- RFC 3339
//     action             TEXT    NOT NULL,   -- e.g. "download_capture", "download_print"
//     certificate_number TEXT    NOT NULL,   -- "" when the record had none
//     record_type        TEXT    NOT NULL,   -- birth | death | marriage | divorce
//     artifact_hash      TEXT,               -- SHA-256 hex of the PDF, if one was produced
//     success            INTEGER NOT NULL,   -- 0 = failure, 1 = success
//     details            TEXT                -- optional free-form context
//   )

use std::path::Path;

use certwerk_core::error::CertwerkError;
use certwerk_core::types::RecordType;
use chrono::Utc;
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS certificate_audit (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp          TEXT    NOT NULL,
    action             TEXT    NOT NULL,
    certificate_number TEXT    NOT NULL,
    record_type        TEXT    NOT NULL,
    artifact_hash      TEXT,
    success            INTEGER NOT NULL,
    details            TEXT
);
CREATE INDEX IF NOT EXISTS idx_certificate_audit_number
    ON certificate_audit (certificate_number);";

const SELECT_COLUMNS: &str =
    "SELECT id, timestamp, action, certificate_number, record_type, artifact_hash, success, details
     FROM certificate_audit";

/// Convert a `rusqlite::Error` into a `CertwerkError::Database`.
fn db_err(e: rusqlite::Error) -> CertwerkError {
    CertwerkError::Database(e.to_string())
}

/// A single entry in the audit log, used for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub action: String,
    pub certificate_number: String,
    pub record_type: String,
    pub artifact_hash: Option<String>,
    pub success: bool,
    pub details: Option<String>,
}

impl AuditEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            action: row.get(2)?,
            certificate_number: row.get(3)?,
            record_type: row.get(4)?,
            artifact_hash: row.get(5)?,
            success: row.get::<_, i32>(6)? != 0,
            details: row.get(7)?,
        })
    }
}

/// What happened to one certificate, ready to be appended to the log.
#[derive(Debug, Clone, Copy)]
pub struct AuditEvent<'a> {
    pub action: &'a str,
    pub certificate_number: &'a str,
    pub record_type: RecordType,
    pub artifact_hash: Option<&'a str>,
    pub success: bool,
    pub details: Option<&'a str>,
}

/// Append-only audit log backed by a SQLite database.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `path`.
    ///
    /// WAL mode is enabled for better concurrent-read performance.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CertwerkError> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        debug!("audit log opened");
        Ok(Self { conn })
    }

    /// Open an in-memory audit database (useful for tests).
    pub fn open_in_memory() -> Result<Self, CertwerkError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        debug!("in-memory audit log opened");
        Ok(Self { conn })
    }

    /// Append an event.
    #[instrument(skip(self, event), fields(action = event.action, cert = event.certificate_number, success = event.success))]
    pub fn record(&self, event: &AuditEvent<'_>) -> Result<(), CertwerkError> {
        let timestamp = Utc::now().to_rfc3339();
        let success_int: i32 = if event.success { 1 } else { 0 };

        self.conn
            .execute(
                "INSERT INTO certificate_audit
                    (timestamp, action, certificate_number, record_type, artifact_hash, success, details)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    timestamp,
                    event.action,
                    event.certificate_number,
                    event.record_type.as_str(),
                    event.artifact_hash,
                    success_int,
                    event.details
                ],
            )
            .map_err(db_err)?;

        debug!("audit entry recorded");
        Ok(())
    }

    /// All entries for a certificate number, oldest first.
    pub fn entries_for_certificate(
        &self,
        certificate_number: &str,
    ) -> Result<Vec<AuditEntry>, CertwerkError> {
        let sql = format!("{SELECT_COLUMNS} WHERE certificate_number = ?1 ORDER BY id ASC");
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![certificate_number], AuditEntry::from_row)
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    /// The most recent `limit` entries, newest first.
    pub fn recent_entries(&self, limit: u32) -> Result<Vec<AuditEntry>, CertwerkError> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT ?1");
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![limit], AuditEntry::from_row)
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    /// Total number of entries in the audit log.
    pub fn count(&self) -> Result<u64, CertwerkError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM certificate_audit", [], |row| row.get(0))
            .map_err(db_err)
    }
}
