//! SQLite candidate store with migrations
//!
//! Holds the raw candidate records. Rows are append-only: there is no update
//! or delete path, and `get_all` returns them in insertion order, which is the
//! positional order the lexical indices are built against.

use crate::error::{Result, SiftError};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// A stored resume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    /// Display name, empty when the source did not provide one
    pub name: String,
    pub text: String,
}

impl Candidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Database manager with migration support
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a new database connection
    pub fn new(db_path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SiftError::Io {
                source: e,
                context: format!("Failed to create database directory: {:?}", parent),
            })?;
        }

        let manager = SqliteConnectionManager::file(db_path);

        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e| SiftError::Config(format!("Failed to create connection pool: {}", e)))?;

        {
            let conn = pool
                .get()
                .map_err(|e| SiftError::Config(format!("Failed to get connection: {}", e)))?;

            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA busy_timeout = 5000;
                ",
            )?;
        }

        let db = Self { pool };

        db.migrate()?;

        Ok(db)
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| SiftError::Config(format!("Failed to get connection: {}", e)))
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM _migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        for (version, migration) in MIGRATIONS.iter().enumerate() {
            let version = version as i32 + 1;

            if version > current_version {
                tracing::info!("Applying migration {}", version);

                conn.execute_batch(migration)?;

                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
                    params![version],
                )?;
            }
        }

        Ok(())
    }

    /// Check whether a candidate with this id is already stored
    pub fn candidate_exists(&self, id: &str) -> Result<bool> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM candidates WHERE id = ?1",
                params![id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Insert a candidate. Returns false when the id was already present
    /// (the stored record is left untouched).
    pub fn insert_candidate(&self, candidate: &Candidate) -> Result<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO candidates (id, name, resume_text, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                candidate.id,
                candidate.name,
                candidate.text,
                chrono::Utc::now().timestamp()
            ],
        )?;
        Ok(changed == 1)
    }

    /// All candidates as (id, text) in insertion order
    pub fn get_all_candidates(&self) -> Result<Vec<(String, String)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id, resume_text FROM candidates ORDER BY seq ASC")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<(String, String)>, _>>()?;
        Ok(rows)
    }

    /// Fetch one candidate by id
    pub fn get_candidate(&self, id: &str) -> Result<Option<Candidate>> {
        let conn = self.get_conn()?;
        let candidate = conn
            .query_row(
                "SELECT id, name, resume_text FROM candidates WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Candidate {
                        id: row.get(0)?,
                        name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        text: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(candidate)
    }

    /// Number of stored candidates
    pub fn candidate_count(&self) -> Result<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM candidates", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Database migrations (each string is one migration)
const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    CREATE TABLE candidates (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        name TEXT,
        resume_text TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    "#,
];
