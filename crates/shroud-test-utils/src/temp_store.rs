// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite binding store living in a temporary directory.

use std::sync::Arc;

use shroud_config::model::StorageConfig;
use shroud_core::ShroudError;
use shroud_storage::SqliteBindingStore;
use tempfile::TempDir;

/// A real [`SqliteBindingStore`] whose database file is removed on drop.
pub struct TempStore {
    pub store: Arc<SqliteBindingStore>,
    config: StorageConfig,
    _dir: TempDir,
}

impl TempStore {
    /// Create a fresh database with the default table name.
    pub async fn new() -> Result<Self, ShroudError> {
        Self::with_table("user_bindings").await
    }

    /// Create a fresh database using `table` as the binding table.
    pub async fn with_table(table: &str) -> Result<Self, ShroudError> {
        let dir = TempDir::new().map_err(ShroudError::storage)?;
        let db_path = dir.path().join("test.db");
        let config = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            table_name: table.to_string(),
            wal_mode: true,
        };
        let store = SqliteBindingStore::open(&config).await?;
        Ok(Self {
            store: Arc::new(store),
            config,
            _dir: dir,
        })
    }

    /// Storage config pointing at this database, for reopening it.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}
