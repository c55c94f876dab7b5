// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the registry, dispatcher, delivery engine, and adapters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Platform-assigned identifier of an end user.
///
/// For private chats the platform uses the same number as the chat id, so
/// this value doubles as the destination for replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalUserId(pub i64);

impl fmt::Display for ExternalUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a forum thread inside the operator workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThreadId(pub i32);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the operator workspace (the forum-enabled group chat).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceId(pub i64);

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a message accepted by the messaging endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Opaque per-user token shown to operators in place of the real identity.
///
/// Generated once from 122 random bits (UUIDv4) and never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnonId(Uuid);

impl AnonId {
    /// Number of leading characters exposed to operators.
    pub const TAG_LEN: usize = 4;

    /// Generates a fresh random anonymous id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// The short tag operators see: the first [`Self::TAG_LEN`] characters
    /// of the hyphenated lowercase form.
    pub fn tag(&self) -> String {
        let mut buf = Uuid::encode_buffer();
        let full = self.0.hyphenated().encode_lower(&mut buf);
        full[..Self::TAG_LEN].to_string()
    }
}

impl fmt::Display for AnonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for AnonId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// The persisted triple linking an external user, an anon id, and a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBinding {
    /// Row-creation order. Display only, never used for routing.
    pub sequence: i64,
    pub user_id: ExternalUserId,
    pub anon_id: AnonId,
    pub thread_id: ThreadId,
}

/// A binding about to be inserted (no sequence number yet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewBinding {
    pub user_id: ExternalUserId,
    pub anon_id: AnonId,
    pub thread_id: ThreadId,
}

/// The kind of content carried by a [`ContentItem`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Photo,
    Video,
    Document,
    Audio,
    Voice,
    Unsupported,
}

/// A single normalized piece of inbound content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub kind: ContentKind,
    /// Literal text for [`ContentKind::Text`], a platform file id for media,
    /// empty for [`ContentKind::Unsupported`].
    pub payload: String,
    /// Optional text accompanying media kinds.
    pub caption: Option<String>,
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Text,
            payload: text.into(),
            caption: None,
        }
    }

    pub fn media(kind: ContentKind, file_id: impl Into<String>, caption: Option<String>) -> Self {
        Self {
            kind,
            payload: file_id.into(),
            caption,
        }
    }

    pub fn unsupported() -> Self {
        Self {
            kind: ContentKind::Unsupported,
            payload: String::new(),
            caption: None,
        }
    }
}

/// Where an outbound send is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    /// A thread in the operator workspace.
    Thread {
        workspace: WorkspaceId,
        thread: ThreadId,
    },
    /// An end user's private chat.
    User(ExternalUserId),
}

impl Destination {
    /// Returns the end user addressed by this destination, if any.
    pub fn user(&self) -> Option<ExternalUserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Thread { .. } => None,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thread { workspace, thread } => write!(f, "thread {workspace}/{thread}"),
            Self::User(id) => write!(f, "user {id}"),
        }
    }
}

/// One send primitive with all of its arguments bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SendOperation {
    Text { text: String },
    Photo { file_id: String, caption: Option<String> },
    Video { file_id: String, caption: Option<String> },
    Document { file_id: String, caption: Option<String> },
    Audio { file_id: String, caption: Option<String> },
    Voice { file_id: String, caption: Option<String> },
}

impl SendOperation {
    /// The content kind this operation delivers.
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Text { .. } => ContentKind::Text,
            Self::Photo { .. } => ContentKind::Photo,
            Self::Video { .. } => ContentKind::Video,
            Self::Document { .. } => ContentKind::Document,
            Self::Audio { .. } => ContentKind::Audio,
            Self::Voice { .. } => ContentKind::Voice,
        }
    }

    /// The text or caption carried by this operation.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Photo { caption, .. }
            | Self::Video { caption, .. }
            | Self::Document { caption, .. }
            | Self::Audio { caption, .. }
            | Self::Voice { caption, .. } => caption.as_deref(),
        }
    }
}

/// A fully-bound outbound send: destination plus operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundSend {
    pub destination: Destination,
    pub operation: SendOperation,
}

impl OutboundSend {
    pub fn new(destination: Destination, operation: SendOperation) -> Self {
        Self {
            destination,
            operation,
        }
    }

    /// Convenience constructor for a plain text send.
    pub fn text(destination: Destination, text: impl Into<String>) -> Self {
        Self::new(destination, SendOperation::Text { text: text.into() })
    }
}

/// A platform event after classification and normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// An end user opened the bot (`/start` in a private chat).
    UserStart { user_id: ExternalUserId },
    /// An end user sent a message in a private chat.
    UserMessage {
        user_id: ExternalUserId,
        content: ContentItem,
    },
    /// An operator posted in the operator workspace.
    OperatorMessage {
        thread_id: Option<ThreadId>,
        content: ContentItem,
    },
    /// An operator edited a message in the operator workspace.
    OperatorMessageEdited {
        thread_id: Option<ThreadId>,
        content: ContentItem,
    },
}

impl InboundEvent {
    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::UserStart { .. } => "user_start",
            Self::UserMessage { .. } => "user_message",
            Self::OperatorMessage { .. } => "operator_message",
            Self::OperatorMessageEdited { .. } => "operator_message_edited",
        }
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Messaging,
    Storage,
}
