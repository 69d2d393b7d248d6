pub const SCHEMA: &str = r#"
-- Images table: one row per distinct file content
CREATE TABLE IF NOT EXISTS images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    sha256 TEXT UNIQUE,
    tags TEXT  -- JSON array of strings
);

CREATE INDEX IF NOT EXISTS idx_images_name ON images(name);

-- Bulk renames that have not yet reached all three artifacts
CREATE TABLE IF NOT EXISTS pending_renames (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    old_name TEXT NOT NULL,
    new_name TEXT NOT NULL,
    thumbnail_done INTEGER NOT NULL DEFAULT 0,
    store_done INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

/// Statements applied after `SCHEMA`; failures are ignored so they can be
/// re-run against databases that already have them.
pub const MIGRATIONS: &[&str] = &[
    // Rows written before tags were JSON may hold NULL
    "UPDATE images SET tags = '' WHERE tags IS NULL",
];
