// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All queries are serialized through tokio-rusqlite's single background
//! thread. Each query is one `call()` closure, so no connection or
//! transaction outlives a single await.

use std::time::Duration;

use shroud_core::ShroudError;
use tokio_rusqlite::Connection;
use tracing::debug;

/// Handle to the SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the database at `path` in WAL mode.
    pub async fn open(path: &str) -> Result<Self, ShroudError> {
        Self::open_with(path, true).await
    }

    /// Opens the database, choosing the journal mode explicitly.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, ShroudError> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| ShroudError::storage(e.to_string()))?;

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.busy_timeout(Duration::from_secs(5))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying async connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs `SELECT 1` to verify the database answers queries.
    pub async fn ping(&self) -> Result<(), ShroudError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoints the WAL and truncates it.
    pub async fn checkpoint(&self) -> Result<(), ShroudError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    /// Checkpoints the WAL and closes the connection.
    pub async fn close(self) -> Result<(), ShroudError> {
        self.checkpoint().await?;
        self.conn
            .close()
            .await
            .map_err(|e| ShroudError::storage(e.to_string()))
    }
}

/// Maps a tokio-rusqlite error into [`ShroudError::Storage`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ShroudError {
    ShroudError::storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_answers_ping() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ping.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());
        db.ping().await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn wal_mode_is_enabled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        let mode: String = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn open_fails_for_unreachable_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("x.db");
        let result = Database::open(path.to_str().unwrap()).await;
        assert!(matches!(result, Err(ShroudError::Storage { .. })));
    }
}
