//! Durable per-file result store.
//!
//! Each [`BatchRecord`] is committed in its own transaction with
//! `synchronous = FULL`, so once [`ResultSink::append`] returns `Ok` the row
//! survives a crash, and a reader never sees a partially written row.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::SinkError;
use crate::metrics::Metrics;

/// One report row.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRecord {
    pub file_path: String,
    pub metrics: Metrics,
    pub elapsed: Duration,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Append-only destination for batch records.
pub trait ResultSink {
    /// Persist `record` durably before returning.
    fn append(&mut self, record: &BatchRecord) -> Result<(), SinkError>;

    /// Human-readable location, for the final summary.
    fn location(&self) -> String;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS execution_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    filepath TEXT NOT NULL,
    initial_coverage REAL NOT NULL,
    final_coverage REAL NOT NULL,
    lines_covered REAL NOT NULL,
    total_lines REAL NOT NULL,
    tests_added REAL NOT NULL,
    duration TEXT NOT NULL,
    duration_ms INTEGER NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT
);
"#;

/// SQLite-backed sink. Rows from every run share one table, tagged with the
/// run's id.
pub struct SqliteSink {
    conn: Connection,
    path: PathBuf,
    run_id: Uuid,
}

impl SqliteSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn,
            path,
            run_id: Uuid::new_v4(),
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }
}

impl ResultSink for SqliteSink {
    fn append(&mut self, record: &BatchRecord) -> Result<(), SinkError> {
        let m = &record.metrics;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO execution_log (
                run_id, filepath, initial_coverage, final_coverage, lines_covered,
                total_lines, tests_added, duration, duration_ms, start_time, end_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                self.run_id.to_string(),
                record.file_path,
                m.initial_coverage,
                m.final_coverage,
                m.lines_covered,
                m.total_lines,
                m.tests_added,
                format!("{:?}", record.elapsed),
                i64::try_from(record.elapsed.as_millis()).unwrap_or(i64::MAX),
                record.start_time.to_rfc3339(),
                record.end_time.map(|t| t.to_rfc3339()),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
