//! SQL schema for the SQLite account store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
///
/// Both uniqueness invariants live in the database, not in application
/// code: the primary key is the case-folded identifier (SQLite's own
/// NOCASE collation only folds ASCII, so folding happens before binding),
/// and the partial unique index admits at most one registration row per
/// profile.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS accounts (
    id_folded       TEXT PRIMARY KEY,   -- fold_id(id); case-variants collide here
    id              TEXT    NOT NULL,   -- original casing, returned to callers
    profile_id      TEXT    NOT NULL,   -- opaque, matched case-sensitively
    created_at      TEXT    NOT NULL,   -- RFC 3339 UTC, fixed-width microseconds
    last_used_at    TEXT    NOT NULL,
    last_seen_at    TEXT    NOT NULL,
    is_registration INTEGER NOT NULL DEFAULT 0
);

-- At most one registration account per profile.
CREATE UNIQUE INDEX IF NOT EXISTS accounts_unique_registration
    ON accounts(profile_id) WHERE is_registration = 1;

CREATE INDEX IF NOT EXISTS accounts_profile_idx ON accounts(profile_id);

PRAGMA user_version = 1;
";
