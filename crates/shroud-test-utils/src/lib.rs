// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Shroud integration tests.
//!
//! Provides mock adapters and a throwaway SQLite store for fast,
//! deterministic, CI-runnable tests without a chat platform.
//!
//! # Components
//!
//! - [`MockEndpoint`] - Scriptable messaging endpoint with send capture and event injection
//! - [`MemoryStore`] - In-memory binding store with failure toggles
//! - [`TempStore`] - SQLite binding store in a temporary directory

pub mod memory_store;
pub mod mock_endpoint;
pub mod temp_store;

pub use memory_store::MemoryStore;
pub use mock_endpoint::{CreatedThread, MockEndpoint, SentRecord};
pub use temp_store::TempStore;
