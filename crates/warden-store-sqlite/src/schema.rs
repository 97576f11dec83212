//! SQL schema for the Warden SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per account. The raw fields are the source of truth;
-- is_disabled and status_stale_from are materialized from them on
-- every write and by the sweep.
CREATE TABLE IF NOT EXISTS account_status (
    account_id                 TEXT PRIMARY KEY,
    is_disabled                INTEGER NOT NULL DEFAULT 0,
    is_indefinitely_disabled   INTEGER,          -- NULL on legacy rows
    is_deactivated             INTEGER,          -- NULL on legacy rows
    disable_reason             TEXT,
    temporarily_disabled_from  TEXT,             -- RFC 3339 UTC
    temporarily_disabled_until TEXT,
    account_valid_from         TEXT,
    account_valid_until        TEXT,
    delete_at                  TEXT,
    anonymize_at               TEXT,
    is_anonymized              INTEGER,          -- NULL on legacy rows
    anonymized_at              TEXT,
    status_stale_from          TEXT,
    version                    INTEGER NOT NULL DEFAULT 1,
    updated_at                 TEXT NOT NULL
);

-- Bulk filters ('all currently disabled accounts') and the sweep query.
CREATE INDEX IF NOT EXISTS account_status_disabled_idx
    ON account_status(is_disabled);
CREATE INDEX IF NOT EXISTS account_status_stale_idx
    ON account_status(status_stale_from);

PRAGMA user_version = 1;
";
