//! SQL schema for the Ember SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS handles (
    handle_id     TEXT PRIMARY KEY,
    handle        TEXT NOT NULL,
    status        TEXT NOT NULL DEFAULT 'pending',  -- 'pending' | 'hydrating' | 'complete' | 'error'
    profile_json  TEXT,            -- cached ProfileSnapshot, JSON
    error_message TEXT,
    created_at    TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    updated_at    TEXT NOT NULL    -- delta-sync high-water mark
);

-- Exactly one row per case-insensitive handle.
CREATE UNIQUE INDEX IF NOT EXISTS handles_handle_idx
    ON handles(handle COLLATE NOCASE);

-- Activity rows are insert-only.
-- No UPDATE is ever issued against this table.
CREATE TABLE IF NOT EXISTS activity (
    handle_id  TEXT NOT NULL REFERENCES handles(handle_id) ON DELETE CASCADE,
    collection TEXT NOT NULL,   -- full collection NSID
    timestamp  TEXT NOT NULL,   -- ISO 8601 UTC; the record's own timestamp
    UNIQUE (handle_id, collection, timestamp)
);

-- Range scans over the one-year heatmap window.
CREATE INDEX IF NOT EXISTS activity_handle_ts_idx
    ON activity(handle_id, timestamp);

PRAGMA user_version = 1;
";
