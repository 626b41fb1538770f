//! SQL schema for the Turnstile SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS visitor_passes (
    pass_id          TEXT PRIMARY KEY,
    code             TEXT NOT NULL UNIQUE,
    full_name        TEXT NOT NULL,
    document_number  TEXT NOT NULL,
    company          TEXT,
    valid_from       TEXT NOT NULL,
    valid_until      TEXT NOT NULL,
    status           TEXT NOT NULL DEFAULT 'pending',  -- pending | inside | outside | closed
    created_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS employee_credentials (
    credential_id    TEXT PRIMARY KEY,
    code             TEXT NOT NULL UNIQUE,
    kind             TEXT NOT NULL,                    -- personal | vehicle
    full_name        TEXT NOT NULL,
    document         TEXT NOT NULL,
    status           TEXT NOT NULL DEFAULT 'allowed',  -- allowed | blocked
    created_at       TEXT NOT NULL
);

-- Strictly append-only. No UPDATE or DELETE is ever issued against this
-- table. `seq` breaks ties between entries sharing a timestamp.
CREATE TABLE IF NOT EXISTS access_logs (
    seq           INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id      TEXT NOT NULL UNIQUE,
    subject_type  TEXT NOT NULL,   -- visitor | employee
    subject_id    TEXT NOT NULL,   -- weak reference, no FOREIGN KEY
    direction     TEXT NOT NULL,   -- in | out
    gate          TEXT NOT NULL,
    operator      TEXT NOT NULL,
    recorded_at   TEXT NOT NULL    -- RFC 3339 UTC, microseconds; server-assigned
);

CREATE TABLE IF NOT EXISTS audit_events (
    seq           INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id      TEXT NOT NULL UNIQUE,
    action        TEXT NOT NULL,
    subject_type  TEXT,
    subject_id    TEXT,
    code          TEXT NOT NULL,
    gate          TEXT NOT NULL,
    operator      TEXT NOT NULL,
    detail        TEXT,
    recorded_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS access_logs_subject_idx
    ON access_logs(subject_type, subject_id, recorded_at);
CREATE INDEX IF NOT EXISTS access_logs_gate_idx ON access_logs(gate);

PRAGMA user_version = 1;
";
