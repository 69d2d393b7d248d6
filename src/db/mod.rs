mod schema;
pub mod images;
pub mod pending;
pub mod tags;

use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

use crate::error::{GalleryError, Result};

pub use pending::PendingRename;
pub use schema::{MIGRATIONS, SCHEMA};

/// A persisted image: tag state keyed by content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    pub id: i64,
    pub name: String,
    pub fingerprint: String,
    pub tags: Vec<String>,
}

/// What `upsert_by_fingerprint` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Renamed { previous: String },
    Unchanged,
}

/// The tag store. Access is serialised per statement by SQLite; there is no
/// locking above that, so concurrent edits resolve as last write wins.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| GalleryError::file_access(parent, e))?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Creates the tables if missing. Safe to call on every startup.
    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.run_migrations()?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        for migration in MIGRATIONS {
            let _ = self.conn.execute(migration, []);
        }
        Ok(())
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
pub(crate) fn test_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.initialize().unwrap();
    db
}
