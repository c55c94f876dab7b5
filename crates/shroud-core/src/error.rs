// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Shroud relay.

use thiserror::Error;

use crate::types::{AnonId, ExternalUserId, ThreadId};

/// The primary error type used across all Shroud adapter traits and core operations.
///
/// A routing miss (no binding for a thread) is not an error: lookups return
/// `Option` and callers ignore the event.
#[derive(Debug, Error)]
pub enum ShroudError {
    /// Configuration errors (missing credential, missing group id, invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database open, connectivity, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A thread was created for the user but the binding could not be persisted.
    ///
    /// The created thread is not deleted; its id is carried here so the
    /// caller can still relay the current message.
    #[error("registration failed for user {user_id}: thread {thread_id} created but not persisted")]
    RegistrationFailed {
        user_id: ExternalUserId,
        anon_id: AnonId,
        thread_id: ThreadId,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging endpoint errors (network failure, API error, rate limiting).
    #[error("endpoint error: {message}")]
    Endpoint {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The messaging endpoint refused the operation (missing admin rights, forum disabled).
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// An event could not be routed (no destination, malformed context).
    #[error("routing error: {0}")]
    Routing(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ShroudError {
    /// Wraps any error as a storage failure.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage {
            source: source.into(),
        }
    }
}
