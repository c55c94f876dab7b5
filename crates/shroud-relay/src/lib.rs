// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay core for Shroud.
//!
//! - [`IdentityRegistry`] binds each end user to an anonymous id and an
//!   operator thread
//! - [`Dispatcher`] turns normalized content into one outbound send
//! - [`DeliveryEngine`] sends once and retries failures from the [`RetryQueue`]
//! - [`RelayService`] ties them together over an event source

pub mod delivery;
pub mod dispatcher;
pub mod queue;
pub mod recording;
pub mod registry;
pub mod service;
pub mod shutdown;
pub mod texts;

pub use delivery::{DeliveryEngine, DeliveryOutcome, DrainReport};
pub use dispatcher::Dispatcher;
pub use queue::{RetryDescriptor, RetryQueue};
pub use registry::{IdentityRegistry, Registration, RegistrationOrigin};
pub use service::RelayService;
pub use shutdown::install_signal_handler;
