// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging endpoint traits: outbound send primitives and the inbound event stream.

use async_trait::async_trait;

use crate::error::ShroudError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Destination, InboundEvent, MessageId, ThreadId, WorkspaceId};

/// Outbound side of the chat platform.
///
/// Each send primitive is invoked exactly once per call. Retrying is the
/// caller's concern.
#[async_trait]
pub trait MessagingEndpoint: PluginAdapter {
    /// Creates a new thread in the operator workspace and returns its id.
    ///
    /// Fails with [`ShroudError::Endpoint`] when the platform is unreachable
    /// and [`ShroudError::PermissionDenied`] when the bot may not manage topics.
    async fn create_thread(
        &self,
        workspace: WorkspaceId,
        label: &str,
    ) -> Result<ThreadId, ShroudError>;

    async fn send_text(&self, to: &Destination, text: &str) -> Result<MessageId, ShroudError>;

    async fn send_photo(
        &self,
        to: &Destination,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, ShroudError>;

    async fn send_video(
        &self,
        to: &Destination,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, ShroudError>;

    async fn send_document(
        &self,
        to: &Destination,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, ShroudError>;

    async fn send_audio(
        &self,
        to: &Destination,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, ShroudError>;

    async fn send_voice(
        &self,
        to: &Destination,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, ShroudError>;
}

/// Inbound side of the chat platform.
#[async_trait]
pub trait EventSource: PluginAdapter {
    /// Starts receiving platform updates.
    async fn connect(&mut self) -> Result<(), ShroudError>;

    /// Receives the next classified inbound event.
    async fn receive(&self) -> Result<InboundEvent, ShroudError>;
}
