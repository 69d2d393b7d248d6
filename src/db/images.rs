//! Image record and tag operations.

use rusqlite::params;
use tracing::{debug, info, warn};

use super::tags::{decode_tags, encode_tags};
use super::{Database, ImageRecord, UpsertOutcome};
use crate::error::{GalleryError, Result};

impl Database {
    /// Inserts an untagged record for a new fingerprint, or repoints the
    /// display name when known content shows up under another file name.
    pub fn upsert_by_fingerprint(&self, fingerprint: &str, name: &str) -> Result<UpsertOutcome> {
        let existing = self.conn().query_row(
            "SELECT name FROM images WHERE sha256 = ?",
            [fingerprint],
            |row| row.get::<_, Option<String>>(0),
        );

        match existing {
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                self.conn().execute(
                    "INSERT INTO images (name, sha256, tags) VALUES (?, ?, ?)",
                    params![name, fingerprint, encode_tags(&[])],
                )?;
                info!("Inserted: {}", name);
                Ok(UpsertOutcome::Inserted)
            }
            Err(e) => Err(e.into()),
            Ok(Some(previous)) if previous == name => Ok(UpsertOutcome::Unchanged),
            Ok(previous) => {
                let previous = previous.unwrap_or_default();
                self.conn().execute(
                    "UPDATE images SET name = ? WHERE sha256 = ?",
                    params![name, fingerprint],
                )?;
                info!("Updated name: {} -> {}", previous, name);
                Ok(UpsertOutcome::Renamed { previous })
            }
        }
    }

    pub fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<ImageRecord>> {
        let result = self.conn().query_row(
            "SELECT id, name, sha256, tags FROM images WHERE sha256 = ?",
            [fingerprint],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        );

        match result {
            Ok((id, name, fingerprint, raw_tags)) => {
                let tags = decode_tags(&fingerprint, raw_tags.as_deref())?;
                Ok(Some(ImageRecord {
                    id,
                    name: name.unwrap_or_default(),
                    fingerprint,
                    tags,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Every record in insertion order.
    ///
    /// A row whose tag column cannot be decoded is logged and returned with
    /// no tags rather than failing the whole listing.
    pub fn all_records(&self) -> Result<Vec<ImageRecord>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, name, sha256, tags FROM images WHERE sha256 IS NOT NULL ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, name, fingerprint, raw_tags) = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!("Skipping unreadable image row: {}", e);
                    continue;
                }
            };
            let tags = decode_tags(&fingerprint, raw_tags.as_deref()).unwrap_or_else(|e| {
                warn!("{}", e);
                Vec::new()
            });
            records.push(ImageRecord {
                id,
                name: name.unwrap_or_default(),
                fingerprint,
                tags,
            });
        }
        Ok(records)
    }

    pub fn get_tags(&self, fingerprint: &str) -> Result<Vec<String>> {
        let raw = self.conn().query_row(
            "SELECT tags FROM images WHERE sha256 = ?",
            [fingerprint],
            |row| row.get::<_, Option<String>>(0),
        );

        match raw {
            Ok(raw) => decode_tags(fingerprint, raw.as_deref()),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(GalleryError::NotFound(fingerprint.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Appends `tag` unless an identical tag is already present.
    /// Returns whether the list changed.
    pub fn add_tag(&self, fingerprint: &str, tag: &str) -> Result<bool> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(GalleryError::EmptyTag);
        }

        let mut tags = self.get_tags(fingerprint)?;
        if tags.iter().any(|t| t == tag) {
            debug!("{} already tagged {:?}", fingerprint, tag);
            return Ok(false);
        }

        tags.push(tag.to_string());
        self.write_tags(fingerprint, &tags)?;
        Ok(true)
    }

    /// Removes the first exact match of `tag`, keeping the order of the rest.
    /// Returns whether the list changed.
    pub fn remove_tag(&self, fingerprint: &str, tag: &str) -> Result<bool> {
        let tag = tag.trim();
        let mut tags = self.get_tags(fingerprint)?;

        let Some(position) = tags.iter().position(|t| t == tag) else {
            return Ok(false);
        };

        tags.remove(position);
        self.write_tags(fingerprint, &tags)?;
        Ok(true)
    }

    fn write_tags(&self, fingerprint: &str, tags: &[String]) -> Result<()> {
        let updated = self.conn().execute(
            "UPDATE images SET tags = ? WHERE sha256 = ?",
            params![encode_tags(tags), fingerprint],
        )?;
        if updated == 0 {
            return Err(GalleryError::NotFound(fingerprint.to_string()));
        }
        debug!("Updated {} with tags {:?}", fingerprint, tags);
        Ok(())
    }

    /// Repoints every record named `old_name`. Returns the number of rows changed.
    pub fn rename_record(&self, old_name: &str, new_name: &str) -> Result<usize> {
        let updated = self.conn().execute(
            "UPDATE images SET name = ? WHERE name = ?",
            params![new_name, old_name],
        )?;
        Ok(updated)
    }

    pub fn delete_by_fingerprint(&self, fingerprint: &str) -> Result<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM images WHERE sha256 = ?", [fingerprint])?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    #[test]
    fn test_upsert_insert_then_unchanged() {
        let db = test_db();
        assert_eq!(db.upsert_by_fingerprint("aa", "a.png").unwrap(), UpsertOutcome::Inserted);
        assert_eq!(db.upsert_by_fingerprint("aa", "a.png").unwrap(), UpsertOutcome::Unchanged);

        let record = db.find_by_fingerprint("aa").unwrap().unwrap();
        assert_eq!(record.name, "a.png");
        assert!(record.tags.is_empty());
    }

    #[test]
    fn test_upsert_rename_keeps_single_row_and_tags() {
        let db = test_db();
        db.upsert_by_fingerprint("aa", "a.png").unwrap();
        db.add_tag("aa", "cat").unwrap();

        assert_eq!(
            db.upsert_by_fingerprint("aa", "c.png").unwrap(),
            UpsertOutcome::Renamed {
                previous: "a.png".to_string()
            }
        );

        let records = db.all_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "c.png");
        assert_eq!(records[0].tags, vec!["cat"]);
    }

    #[test]
    fn test_add_tag_is_idempotent() {
        let db = test_db();
        db.upsert_by_fingerprint("fp", "x.png").unwrap();

        assert!(db.add_tag("fp", "cat").unwrap());
        assert!(!db.add_tag("fp", "cat").unwrap());
        assert_eq!(db.get_tags("fp").unwrap(), vec!["cat"]);
    }

    #[test]
    fn test_add_tag_is_case_sensitive_and_trims() {
        let db = test_db();
        db.upsert_by_fingerprint("fp", "x.png").unwrap();

        db.add_tag("fp", "Cat").unwrap();
        db.add_tag("fp", "  cat ").unwrap();
        assert_eq!(db.get_tags("fp").unwrap(), vec!["Cat", "cat"]);
    }

    #[test]
    fn test_empty_tag_rejected() {
        let db = test_db();
        db.upsert_by_fingerprint("fp", "x.png").unwrap();

        assert!(matches!(db.add_tag("fp", "   "), Err(GalleryError::EmptyTag)));
        assert!(db.get_tags("fp").unwrap().is_empty());
    }

    #[test]
    fn test_tag_with_comma_round_trips() {
        let db = test_db();
        db.upsert_by_fingerprint("fp", "x.png").unwrap();

        db.add_tag("fp", "red, green").unwrap();
        db.add_tag("fp", "blue").unwrap();
        assert_eq!(db.get_tags("fp").unwrap(), vec!["red, green", "blue"]);
    }

    #[test]
    fn test_remove_tag_preserves_order() {
        let db = test_db();
        db.upsert_by_fingerprint("fp", "x.png").unwrap();
        for tag in ["a", "b", "c", "d"] {
            db.add_tag("fp", tag).unwrap();
        }

        assert!(db.remove_tag("fp", "b").unwrap());
        let tags = db.get_tags("fp").unwrap();
        assert!(!tags.contains(&"b".to_string()));
        assert_eq!(tags, vec!["a", "c", "d"]);

        // Absent tag is a no-op
        assert!(!db.remove_tag("fp", "zzz").unwrap());
        assert_eq!(db.get_tags("fp").unwrap(), vec!["a", "c", "d"]);
    }

    #[test]
    fn test_remove_tag_first_match_only() {
        let db = test_db();
        db.upsert_by_fingerprint("fp", "x.png").unwrap();
        db.conn()
            .execute("UPDATE images SET tags = 'dup,keep,dup' WHERE sha256 = 'fp'", [])
            .unwrap();

        db.remove_tag("fp", "dup").unwrap();
        assert_eq!(db.get_tags("fp").unwrap(), vec!["keep", "dup"]);
    }

    #[test]
    fn test_unknown_fingerprint_is_not_found() {
        let db = test_db();
        assert!(matches!(db.get_tags("nope"), Err(GalleryError::NotFound(_))));
        assert!(matches!(db.add_tag("nope", "cat"), Err(GalleryError::NotFound(_))));
        assert!(matches!(db.remove_tag("nope", "cat"), Err(GalleryError::NotFound(_))));
        assert!(db.find_by_fingerprint("nope").unwrap().is_none());
    }

    #[test]
    fn test_legacy_rows_are_read_and_rewritten_as_json() {
        let db = test_db();
        db.conn()
            .execute(
                "INSERT INTO images (name, sha256, tags) VALUES ('old.png', 'legacy', 'cat, dog,')",
                [],
            )
            .unwrap();

        assert_eq!(db.get_tags("legacy").unwrap(), vec!["cat", "dog"]);
        db.add_tag("legacy", "bird").unwrap();

        let raw: String = db
            .conn()
            .query_row("SELECT tags FROM images WHERE sha256 = 'legacy'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(raw, r#"["cat","dog","bird"]"#);
    }

    #[test]
    fn test_rename_record_by_name() {
        let db = test_db();
        db.upsert_by_fingerprint("aa", "a.png").unwrap();
        db.upsert_by_fingerprint("bb", "b.png").unwrap();

        assert_eq!(db.rename_record("a.png", "1700000000000.png").unwrap(), 1);
        assert_eq!(db.rename_record("missing.png", "x.png").unwrap(), 0);

        let names: Vec<_> = db.all_records().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["1700000000000.png", "b.png"]);
    }

    #[test]
    fn test_all_records_survives_corrupt_tags() {
        let db = test_db();
        db.upsert_by_fingerprint("aa", "a.png").unwrap();
        db.upsert_by_fingerprint("bb", "b.png").unwrap();
        db.conn()
            .execute("UPDATE images SET tags = '[1, 2]' WHERE sha256 = 'aa'", [])
            .unwrap();

        let records = db.all_records().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].tags.is_empty());
        assert!(matches!(db.get_tags("aa"), Err(GalleryError::TagEncoding { .. })));
    }

    #[test]
    fn test_delete_by_fingerprint() {
        let db = test_db();
        db.upsert_by_fingerprint("aa", "a.png").unwrap();
        assert!(db.delete_by_fingerprint("aa").unwrap());
        assert!(!db.delete_by_fingerprint("aa").unwrap());
        assert!(db.all_records().unwrap().is_empty());
    }
}
