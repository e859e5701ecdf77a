use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection};
use thiserror::Error;
use vulnex_core::Finding;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("result store lock poisoned")]
    Poisoned,
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Where findings are kept. Inserting an existing `(url, path)` is a no-op, not an error.
pub trait ResultSink: Send + Sync {
    /// Returns `true` if the finding was newly stored.
    fn record(&self, finding: &Finding) -> Result<bool, SinkError>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    path TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    content_type TEXT,
    content_length INTEGER NOT NULL,
    body_hash TEXT NOT NULL,
    location TEXT,
    discovered_at TEXT NOT NULL,
    UNIQUE(url, path)
);";

pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, SinkError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, SinkError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn count(&self) -> Result<u64, SinkError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SinkError> {
        self.conn.lock().map_err(|_| SinkError::Poisoned)
    }
}

impl ResultSink for SqliteSink {
    fn record(&self, finding: &Finding) -> Result<bool, SinkError> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO files
             (url, path, status_code, content_type, content_length, body_hash, location, discovered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                finding.url,
                finding.path,
                finding.status_code,
                finding.content_type,
                finding.content_length as i64,
                finding.body_hash.to_hex(),
                finding.location,
                finding.discovered_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted > 0)
    }
}

/// Keeps findings in memory, first write wins.
#[derive(Debug, Default)]
pub struct MemorySink {
    findings: Mutex<BTreeMap<(String, String), Finding>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.findings.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored findings ordered by `(url, path)`.
    pub fn findings(&self) -> Vec<Finding> {
        self.findings
            .lock()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl ResultSink for MemorySink {
    fn record(&self, finding: &Finding) -> Result<bool, SinkError> {
        let mut map = self.findings.lock().map_err(|_| SinkError::Poisoned)?;
        let key = (finding.url.clone(), finding.path.clone());
        if map.contains_key(&key) {
            return Ok(false);
        }
        map.insert(key, finding.clone());
        Ok(true)
    }
}
