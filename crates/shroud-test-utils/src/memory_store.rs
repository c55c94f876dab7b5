// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory binding store with the same uniqueness rules as the SQLite table.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use shroud_core::traits::adapter::PluginAdapter;
use shroud_core::traits::storage::BindingStore;
use shroud_core::types::{
    AdapterType, ExternalUserId, HealthStatus, NewBinding, ThreadId, UserBinding,
};
use shroud_core::ShroudError;

/// A binding store backed by a `Vec`.
///
/// Inserts and lookups can be made to fail independently so tests can
/// exercise the storage error paths.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<UserBinding>>,
    fail_inserts: AtomicBool,
    fail_reads: AtomicBool,
    inserts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `insert` fail with a storage error.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make every lookup fail with a storage error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all stored bindings in insertion order.
    pub async fn rows(&self) -> Vec<UserBinding> {
        self.rows.lock().await.clone()
    }

    /// Number of insert attempts, successful or not.
    pub fn insert_attempts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    fn check_reads(&self) -> Result<(), ShroudError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ShroudError::storage("memory store reads disabled"));
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ShroudError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ShroudError> {
        Ok(())
    }
}

#[async_trait]
impl BindingStore for MemoryStore {
    async fn find_by_user(
        &self,
        user_id: ExternalUserId,
    ) -> Result<Option<UserBinding>, ShroudError> {
        self.check_reads()?;
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|b| b.user_id == user_id).cloned())
    }

    async fn find_by_thread(
        &self,
        thread_id: ThreadId,
    ) -> Result<Option<UserBinding>, ShroudError> {
        self.check_reads()?;
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|b| b.thread_id == thread_id).cloned())
    }

    async fn insert(&self, binding: &NewBinding) -> Result<UserBinding, ShroudError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(ShroudError::storage("memory store inserts disabled"));
        }

        let mut rows = self.rows.lock().await;
        let clash = rows.iter().find_map(|b| {
            if b.user_id == binding.user_id {
                Some("user_id")
            } else if b.anon_id == binding.anon_id {
                Some("anon_id")
            } else if b.thread_id == binding.thread_id {
                Some("thread_id")
            } else {
                None
            }
        });
        if let Some(column) = clash {
            return Err(ShroudError::storage(format!(
                "UNIQUE constraint failed: {column}"
            )));
        }

        let row = UserBinding {
            sequence: rows.len() as i64 + 1,
            user_id: binding.user_id,
            anon_id: binding.anon_id,
            thread_id: binding.thread_id,
        };
        rows.push(row.clone());
        Ok(row)
    }
}
