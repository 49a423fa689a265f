use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use serde::Serialize;

use crate::audit::AuditReport;

const LEDGER_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS audit_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    bookmark_id INTEGER NOT NULL,
    url TEXT NOT NULL,
    outcome TEXT NOT NULL,
    action TEXT NOT NULL,
    detail TEXT,
    checked_at_unix INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_audit_history_bookmark_id ON audit_history(bookmark_id);
"#;

/// One remembered probe result for one bookmark.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuditRecord {
    pub bookmark_id: i64,
    pub url: String,
    pub outcome: String,
    pub action: String,
    pub detail: Option<String>,
    pub checked_at_unix: i64,
}

/// Open (creating if needed) the audit ledger database and make sure the
/// schema exists. Safe to call on every run.
pub fn open_ledger(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let connection = Connection::open(path)
        .with_context(|| format!("failed to open audit ledger {}", path.display()))?;
    connection
        .execute_batch(LEDGER_SCHEMA_SQL)
        .context("failed to initialize audit ledger schema")?;
    Ok(connection)
}

/// Append one row per audited bookmark. Returns the number of rows written.
pub fn record_report(connection: &Connection, report: &AuditReport) -> Result<usize> {
    let checked_at = now_unix();
    let mut inserted = 0;
    for row in &report.bookmarks {
        connection
            .execute(
                "INSERT INTO audit_history (bookmark_id, url, outcome, action, detail, checked_at_unix)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![row.id, row.url, row.outcome, row.action, row.detail, checked_at],
            )
            .with_context(|| format!("failed to record audit row for bookmark {}", row.id))?;
        inserted += 1;
    }
    Ok(inserted)
}

/// Most recent ledger rows for one bookmark, newest first.
pub fn bookmark_history(
    connection: &Connection,
    bookmark_id: i64,
    limit: usize,
) -> Result<Vec<AuditRecord>> {
    let mut statement = connection
        .prepare(
            "SELECT bookmark_id, url, outcome, action, detail, checked_at_unix
             FROM audit_history
             WHERE bookmark_id = ?1
             ORDER BY id DESC
             LIMIT ?2",
        )
        .context("failed to prepare audit history query")?;
    let rows = statement
        .query_map(params![bookmark_id, limit as i64], |row| {
            Ok(AuditRecord {
                bookmark_id: row.get(0)?,
                url: row.get(1)?,
                outcome: row.get(2)?,
                action: row.get(3)?,
                detail: row.get(4)?,
                checked_at_unix: row.get(5)?,
            })
        })
        .context("failed to query audit history")?;
    rows.collect::<Result<Vec<_>, _>>()
        .context("failed to read audit history rows")
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs() as i64)
        .unwrap_or(0)
}
