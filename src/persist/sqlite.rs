//! SQLite-backed named blob medium.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};

use super::{BlobStore, PersistResult};

/// SQLite implementation of [`crate::persist::BlobStore`].
pub struct SqliteBlobStore {
    conn: Connection,
}

impl SqliteBlobStore {
    /// Opens or creates a SQLite-backed medium at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory SQLite medium.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    /// Last write time of `name` in milliseconds, if stored.
    pub fn updated_ms(&self, name: &str) -> PersistResult<Option<u64>> {
        let ts: Option<i64> = self
            .conn
            .query_row(
                "SELECT updated_ms FROM blobs WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ts.map(|v| v as u64))
    }
}

impl BlobStore for SqliteBlobStore {
    fn get(&self, name: &str) -> PersistResult<Option<String>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM blobs WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn set(&mut self, name: &str, value: &str) -> PersistResult<()> {
        self.conn.execute(
            "INSERT INTO blobs(name, payload, updated_ms) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET payload = excluded.payload, updated_ms = excluded.updated_ms",
            params![name, value, now_ms() as i64],
        )?;
        Ok(())
    }

    fn remove(&mut self, name: &str) -> PersistResult<()> {
        self.conn
            .execute("DELETE FROM blobs WHERE name = ?1", params![name])?;
        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
