// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the external collaborators of the relay.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod messaging;
pub mod storage;

pub use adapter::PluginAdapter;
pub use messaging::{EventSource, MessagingEndpoint};
pub use storage::BindingStore;
