// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for user bindings.
//!
//! Provides a WAL-mode SQLite database behind `tokio-rusqlite` (one background
//! thread serializes every call) and the three parameterized queries the
//! identity registry needs: lookup by user, lookup by thread, insert.

pub mod adapter;
pub mod database;
pub mod queries;

pub use adapter::SqliteBindingStore;
pub use database::Database;
