// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity registry: maps external users to anonymous ids and operator threads.
//!
//! Registration is check-then-create. The sequence is serialized per user
//! through an async lock, so concurrent first messages from one user create
//! at most one thread and one binding. Different users never wait on each
//! other.
//!
//! When a thread was created but the binding insert failed, the binding is
//! kept in memory. The same user keeps that thread for the lifetime of the
//! process, later registrations retry the insert, and replies in that thread
//! still resolve.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use shroud_core::{
    AnonId, BindingStore, ExternalUserId, MessagingEndpoint, NewBinding, ShroudError, ThreadId,
    UserBinding, WorkspaceId,
};

use crate::recording;
use crate::texts;

/// How a [`Registration`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOrigin {
    /// The binding was already stored.
    Existing,
    /// A thread was created and the binding stored by this call.
    Created,
    /// A previously unpersisted binding was stored by this call.
    Recovered,
    /// The binding only exists in memory; the insert failed.
    Unpersisted,
}

/// The `(anon id, thread id)` pair a user is relayed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub user_id: ExternalUserId,
    pub anon_id: AnonId,
    pub thread_id: ThreadId,
    pub origin: RegistrationOrigin,
}

impl Registration {
    fn from_binding(binding: &UserBinding, origin: RegistrationOrigin) -> Self {
        Self {
            user_id: binding.user_id,
            anon_id: binding.anon_id,
            thread_id: binding.thread_id,
            origin,
        }
    }

    /// Extracts the in-memory registration carried by
    /// [`ShroudError::RegistrationFailed`], so the caller can still relay the
    /// current message through the created thread.
    pub fn from_failure(err: &ShroudError) -> Option<Self> {
        match err {
            ShroudError::RegistrationFailed {
                user_id,
                anon_id,
                thread_id,
                ..
            } => Some(Self {
                user_id: *user_id,
                anon_id: *anon_id,
                thread_id: *thread_id,
                origin: RegistrationOrigin::Unpersisted,
            }),
            _ => None,
        }
    }
}

/// Creates and resolves user bindings.
pub struct IdentityRegistry {
    store: Arc<dyn BindingStore>,
    endpoint: Arc<dyn MessagingEndpoint>,
    workspace: WorkspaceId,
    locks: DashMap<ExternalUserId, Arc<Mutex<()>>>,
    unpersisted: DashMap<ExternalUserId, NewBinding>,
}

impl IdentityRegistry {
    pub fn new(
        store: Arc<dyn BindingStore>,
        endpoint: Arc<dyn MessagingEndpoint>,
        workspace: WorkspaceId,
    ) -> Self {
        Self {
            store,
            endpoint,
            workspace,
            locks: DashMap::new(),
            unpersisted: DashMap::new(),
        }
    }

    /// Returns the user's registration, creating a thread and a binding on
    /// first contact.
    ///
    /// Idempotent: every call for the same user observes the same anon id and
    /// thread id.
    ///
    /// # Errors
    ///
    /// - [`ShroudError::Storage`] when the lookup fails (no thread is created)
    /// - [`ShroudError::Endpoint`] or [`ShroudError::PermissionDenied`] when
    ///   thread creation fails (nothing is stored)
    /// - [`ShroudError::RegistrationFailed`] when the thread exists but the
    ///   binding could not be stored
    pub async fn register_or_get(
        &self,
        user_id: ExternalUserId,
    ) -> Result<Registration, ShroudError> {
        let lock = self
            .locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.register_locked(user_id).await
        };

        // Only drop the lock once the binding is stored; a failed attempt may
        // still have a waiter about to create a thread under it.
        if result.is_ok() {
            self.locks.remove_if(&user_id, |_, held| Arc::ptr_eq(held, &lock));
        }
        result
    }

    async fn register_locked(
        &self,
        user_id: ExternalUserId,
    ) -> Result<Registration, ShroudError> {
        if let Some(binding) = self.store.find_by_user(user_id).await? {
            recording::record_registration("existing");
            return Ok(Registration::from_binding(
                &binding,
                RegistrationOrigin::Existing,
            ));
        }

        let pending = self.unpersisted.get(&user_id).map(|entry| *entry);
        if let Some(pending) = pending {
            debug!(
                user_id = %user_id,
                thread_id = %pending.thread_id,
                "retrying insert of unpersisted binding"
            );
            return self.persist(pending, RegistrationOrigin::Recovered).await;
        }

        let anon_id = AnonId::generate();
        let label = texts::thread_label(&anon_id);
        let thread_id = match self.endpoint.create_thread(self.workspace, &label).await {
            Ok(id) => id,
            Err(e) => {
                recording::record_registration("failed");
                warn!(user_id = %user_id, error = %e, "thread creation failed");
                return Err(e);
            }
        };
        info!(
            user_id = %user_id,
            thread_id = %thread_id,
            label = label.as_str(),
            "operator thread created"
        );

        let pending = NewBinding {
            user_id,
            anon_id,
            thread_id,
        };
        self.persist(pending, RegistrationOrigin::Created).await
    }

    async fn persist(
        &self,
        pending: NewBinding,
        origin: RegistrationOrigin,
    ) -> Result<Registration, ShroudError> {
        match self.store.insert(&pending).await {
            Ok(binding) => {
                self.unpersisted.remove(&pending.user_id);
                recording::record_registration(match origin {
                    RegistrationOrigin::Recovered => "recovered",
                    _ => "created",
                });
                Ok(Registration::from_binding(&binding, origin))
            }
            Err(e) => {
                error!(
                    user_id = %pending.user_id,
                    thread_id = %pending.thread_id,
                    error = %e,
                    "thread created but binding not persisted"
                );
                recording::record_registration("unpersisted");
                self.unpersisted.insert(pending.user_id, pending);
                Err(ShroudError::RegistrationFailed {
                    user_id: pending.user_id,
                    anon_id: pending.anon_id,
                    thread_id: pending.thread_id,
                    source: Box::new(e),
                })
            }
        }
    }

    /// Finds the user bound to an operator thread.
    ///
    /// `None` means the thread is not bound and the event should be ignored.
    pub async fn resolve_by_thread(
        &self,
        thread_id: ThreadId,
    ) -> Result<Option<ExternalUserId>, ShroudError> {
        if let Some(binding) = self.store.find_by_thread(thread_id).await? {
            return Ok(Some(binding.user_id));
        }
        Ok(self
            .unpersisted
            .iter()
            .find(|entry| entry.thread_id == thread_id)
            .map(|entry| entry.user_id))
    }

    /// Number of bindings held only in memory.
    pub fn unpersisted_count(&self) -> usize {
        self.unpersisted.len()
    }

    /// The operator workspace threads are created in.
    pub fn workspace(&self) -> WorkspaceId {
        self.workspace
    }
}
