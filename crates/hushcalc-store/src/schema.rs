//! Key-value store database schema.

/// SQL to create the preferences table.
pub const CREATE_PREFERENCES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS preferences (
    key        TEXT PRIMARY KEY NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
";

/// Upsert of one key.
pub const UPSERT_PREFERENCE: &str = r"
INSERT INTO preferences (key, value) VALUES (?1, ?2)
ON CONFLICT (key) DO UPDATE
    SET value = excluded.value,
        updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
";
