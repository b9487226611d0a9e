//! SQL schema for the streak SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id         TEXT PRIMARY KEY,
    email           TEXT NOT NULL COLLATE NOCASE UNIQUE,
    password_hash   TEXT NOT NULL,   -- argon2 PHC string
    allow_tracking  INTEGER NOT NULL DEFAULT 0,
    streak_id       TEXT NOT NULL,   -- key into the configured streak catalog
    created_at      TEXT NOT NULL
);

-- Interactions are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS interactions (
    interaction_id  TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL REFERENCES users(user_id),
    streak_id       TEXT NOT NULL,
    timestamp       TEXT NOT NULL,   -- fixed-width RFC 3339 UTC; sorts as text
    serial_number   INTEGER NOT NULL CHECK (serial_number >= 1)
);

-- One row per grant; the same reward may be granted any number of times.
CREATE TABLE IF NOT EXISTS reward_grants (
    grant_id        TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL REFERENCES users(user_id),
    reward_id       TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS interactions_latest_idx
    ON interactions(user_id, streak_id, timestamp);
CREATE INDEX IF NOT EXISTS reward_grants_user_idx
    ON reward_grants(user_id, reward_id);

PRAGMA user_version = 1;
";
