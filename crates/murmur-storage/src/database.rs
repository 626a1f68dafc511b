// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use murmur_core::MurmurError;
use tracing::{debug, info};

use crate::migrations::run_migrations;

/// Handle to the single SQLite connection.
pub struct Database {
    conn: tokio_rusqlite::Connection,
    wal_mode: bool,
}

impl Database {
    /// Opens (creating if needed) the database at `path` in WAL mode and
    /// applies pending migrations.
    pub async fn open(path: &str) -> Result<Self, MurmurError> {
        Self::open_with_options(path, true).await
    }

    pub async fn open_with_options(path: &str, wal_mode: bool) -> Result<Self, MurmurError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| MurmurError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(map_tr_err)?;

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
        debug!(path, wal_mode, "database pragmas applied");

        conn.call(|conn| -> Result<(), MurmurError> { run_migrations(conn) })
            .await
            .map_err(map_tr_err)?;
        info!(path, "database opened");

        Ok(Self { conn, wal_mode })
    }

    /// The underlying async connection. Query modules call through this.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL and closes the connection.
    pub async fn close(self) -> Result<(), MurmurError> {
        if self.wal_mode {
            self.conn
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)?;
        }
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("database closed");
        Ok(())
    }
}

/// Maps a tokio-rusqlite failure (closed connection or closure error) into
/// [`MurmurError::Storage`].
pub(crate) fn map_tr_err(err: impl std::fmt::Display) -> MurmurError {
    MurmurError::storage_message(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        let tables = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('messages', 'cursors') ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();
        assert_eq!(tables, vec!["cursors".to_string(), "messages".to_string()]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn wal_mode_is_enabled() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("wal.db").to_str().unwrap())
            .await
            .unwrap();
        let mode = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.pragma_query_value(None, "journal_mode", |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("again.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }
}
