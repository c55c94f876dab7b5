// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Shroud anonymizing relay.
//!
//! This crate provides the error type, the domain types shared by every
//! component, and the adapter traits through which the relay talks to the
//! chat platform and the binding store.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ShroudError;
pub use types::{
    AdapterType, AnonId, ContentItem, ContentKind, Destination, ExternalUserId, HealthStatus,
    InboundEvent, MessageId, NewBinding, OutboundSend, SendOperation, ThreadId, UserBinding,
    WorkspaceId,
};

// Re-export all adapter traits at crate root.
pub use traits::{BindingStore, EventSource, MessagingEndpoint, PluginAdapter};
