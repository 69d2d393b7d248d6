//! Markers for bulk renames that have not reached every artifact yet.
//!
//! A marker is written before an image is renamed and removed once its
//! file, thumbnail and record all carry the new name. Whatever is left at
//! startup is finished by the recovery pass.

use rusqlite::params;

use super::Database;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRename {
    pub id: i64,
    pub old_name: String,
    pub new_name: String,
    pub thumbnail_done: bool,
    pub store_done: bool,
    pub last_error: Option<String>,
}

impl Database {
    pub fn record_pending_rename(&self, old_name: &str, new_name: &str) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO pending_renames (old_name, new_name) VALUES (?, ?)",
            params![old_name, new_name],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    pub fn mark_thumbnail_done(&self, id: i64) -> Result<()> {
        self.conn()
            .execute("UPDATE pending_renames SET thumbnail_done = 1 WHERE id = ?", [id])?;
        Ok(())
    }

    pub fn mark_store_done(&self, id: i64) -> Result<()> {
        self.conn()
            .execute("UPDATE pending_renames SET store_done = 1 WHERE id = ?", [id])?;
        Ok(())
    }

    pub fn set_pending_error(&self, id: i64, error: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE pending_renames SET last_error = ? WHERE id = ?",
            params![error, id],
        )?;
        Ok(())
    }

    pub fn clear_pending_rename(&self, id: i64) -> Result<()> {
        self.conn()
            .execute("DELETE FROM pending_renames WHERE id = ?", [id])?;
        Ok(())
    }

    /// Outstanding markers, oldest first.
    pub fn pending_renames(&self) -> Result<Vec<PendingRename>> {
        let mut stmt = self.conn().prepare(
            r#"
            SELECT id, old_name, new_name, thumbnail_done, store_done, last_error
            FROM pending_renames
            ORDER BY id
            "#,
        )?;
        let pending = stmt
            .query_map([], |row| {
                Ok(PendingRename {
                    id: row.get(0)?,
                    old_name: row.get(1)?,
                    new_name: row.get(2)?,
                    thumbnail_done: row.get::<_, i64>(3)? != 0,
                    store_done: row.get::<_, i64>(4)? != 0,
                    last_error: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pending)
    }
}
