use crate::timetable::ClassSession;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE: &str = "timetabled.sqlite3";

pub const KEY_AUTH_SESSION: &str = "auth.session";
pub const KEY_CLIENT_CONFIG: &str = "config.client";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let conn = Connection::open(workspace.join(DB_FILE))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    // Last good listing per query scope; only read when the backend is down.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS timetable_cache(
            scope TEXT PRIMARY KEY,
            payload_json TEXT NOT NULL,
            fetched_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

pub fn settings_delete(conn: &Connection, key: &str) -> anyhow::Result<()> {
    conn.execute("DELETE FROM settings WHERE key = ?", [key])?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct CachedListing {
    pub sessions: Vec<ClassSession>,
    pub fetched_at: String,
}

pub fn cache_put(conn: &Connection, scope: &str, sessions: &[ClassSession]) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO timetable_cache(scope, payload_json, fetched_at) VALUES(?, ?, ?)
         ON CONFLICT(scope) DO UPDATE SET
           payload_json = excluded.payload_json,
           fetched_at = excluded.fetched_at",
        (scope, serde_json::to_string(sessions)?, Utc::now().to_rfc3339()),
    )?;
    Ok(())
}

pub fn cache_get(conn: &Connection, scope: &str) -> anyhow::Result<Option<CachedListing>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT payload_json, fetched_at FROM timetable_cache WHERE scope = ?",
            [scope],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let Some((payload, fetched_at)) = row else {
        return Ok(None);
    };
    Ok(Some(CachedListing {
        sessions: serde_json::from_str(&payload)?,
        fetched_at,
    }))
}
