// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the identity/thread binding table.

use async_trait::async_trait;

use crate::error::ShroudError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ExternalUserId, NewBinding, ThreadId, UserBinding};

/// Persistence for [`UserBinding`] rows.
///
/// Three parameterized queries against one logical table. Implementations
/// must enforce uniqueness of the user id, the anon id, and the thread id.
#[async_trait]
pub trait BindingStore: PluginAdapter {
    /// Looks up the binding for an external user.
    async fn find_by_user(
        &self,
        user_id: ExternalUserId,
    ) -> Result<Option<UserBinding>, ShroudError>;

    /// Looks up the binding that owns a thread.
    async fn find_by_thread(&self, thread_id: ThreadId)
        -> Result<Option<UserBinding>, ShroudError>;

    /// Inserts a new binding and returns it with its sequence number.
    async fn insert(&self, binding: &NewBinding) -> Result<UserBinding, ShroudError>;
}
