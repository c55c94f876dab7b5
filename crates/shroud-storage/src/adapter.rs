// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`BindingStore`] trait.

use async_trait::async_trait;
use tracing::{debug, info};

use shroud_config::model::StorageConfig;
use shroud_config::validation::is_sql_identifier;
use shroud_core::{
    AdapterType, BindingStore, ExternalUserId, HealthStatus, NewBinding, PluginAdapter,
    ShroudError, ThreadId, UserBinding,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed binding store.
///
/// Wraps a [`Database`] handle and delegates every operation to
/// [`queries::bindings`] with the configured table name.
pub struct SqliteBindingStore {
    db: Database,
    table: String,
}

impl SqliteBindingStore {
    /// Opens the database described by `config` and makes sure the binding
    /// table exists.
    pub async fn open(config: &StorageConfig) -> Result<Self, ShroudError> {
        if !is_sql_identifier(&config.table_name) {
            return Err(ShroudError::Config(format!(
                "storage.table_name `{}` is not a valid SQL identifier",
                config.table_name
            )));
        }

        let db = Database::open_with(&config.database_path, config.wal_mode).await?;
        queries::bindings::ensure_table(&db, &config.table_name).await?;

        let store = Self {
            db,
            table: config.table_name.clone(),
        };
        let existing = queries::bindings::count(&store.db, &store.table).await?;
        info!(
            path = %config.database_path,
            table = %store.table,
            bindings = existing,
            "binding store opened"
        );
        Ok(store)
    }

    /// Returns the underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Name of the binding table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Number of stored bindings.
    pub async fn count(&self) -> Result<i64, ShroudError> {
        queries::bindings::count(&self.db, &self.table).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteBindingStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ShroudError> {
        self.db.ping().await?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ShroudError> {
        self.db.checkpoint().await?;
        debug!("binding store shut down");
        Ok(())
    }
}

#[async_trait]
impl BindingStore for SqliteBindingStore {
    async fn find_by_user(
        &self,
        user_id: ExternalUserId,
    ) -> Result<Option<UserBinding>, ShroudError> {
        queries::bindings::find_by_user(&self.db, &self.table, user_id).await
    }

    async fn find_by_thread(
        &self,
        thread_id: ThreadId,
    ) -> Result<Option<UserBinding>, ShroudError> {
        queries::bindings::find_by_thread(&self.db, &self.table, thread_id).await
    }

    async fn insert(&self, binding: &NewBinding) -> Result<UserBinding, ShroudError> {
        queries::bindings::insert(&self.db, &self.table, binding).await
    }
}
