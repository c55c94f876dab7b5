// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns Telegram messages into channel-agnostic content and events.
//!
//! [`normalize`] picks the single relayable payload of a message.
//! [`classify`] decides which side of the relay a message belongs to.

use shroud_core::types::{
    ContentItem, ContentKind, ExternalUserId, InboundEvent, ThreadId, WorkspaceId,
};
use teloxide::types::Message;

/// Extracts the relayable content of a message.
///
/// Precedence: text, photo (largest size), video, document, audio, voice.
/// Anything else (stickers, locations, polls, service messages) becomes
/// [`ContentKind::Unsupported`].
pub fn normalize(msg: &Message) -> ContentItem {
    if let Some(text) = msg.text() {
        return ContentItem::text(text);
    }

    let caption = msg.caption().map(str::to_string);

    // Telegram lists photo sizes smallest first.
    if let Some(largest) = msg.photo().and_then(|sizes| sizes.last()) {
        return ContentItem::media(ContentKind::Photo, largest.file.id.to_string(), caption);
    }
    if let Some(video) = msg.video() {
        return ContentItem::media(ContentKind::Video, video.file.id.to_string(), caption);
    }
    if let Some(document) = msg.document() {
        return ContentItem::media(ContentKind::Document, document.file.id.to_string(), caption);
    }
    if let Some(audio) = msg.audio() {
        return ContentItem::media(ContentKind::Audio, audio.file.id.to_string(), caption);
    }
    if let Some(voice) = msg.voice() {
        return ContentItem::media(ContentKind::Voice, voice.file.id.to_string(), caption);
    }

    ContentItem::unsupported()
}

/// Classifies a message (or an edit of one) into an [`InboundEvent`].
///
/// Returns `None` for anything the relay ignores: updates from other chats,
/// bot senders, edits in private chats, and commands in the operator group.
pub fn classify(msg: &Message, workspace: WorkspaceId, edited: bool) -> Option<InboundEvent> {
    if msg.chat.is_private() {
        return classify_private(msg, edited);
    }
    if msg.chat.id.0 != workspace.0 {
        return None;
    }

    // Anonymous admins post as a bot on behalf of the group itself.
    let from_bot = msg.from.as_ref().is_some_and(|u| u.is_bot);
    let as_group = msg.sender_chat.as_ref().is_some_and(|c| c.id == msg.chat.id);
    if from_bot && !as_group {
        return None;
    }
    if is_command(msg) {
        return None;
    }

    let thread_id = topic_thread(msg);
    let content = normalize(msg);
    Some(if edited {
        InboundEvent::OperatorMessageEdited { thread_id, content }
    } else {
        InboundEvent::OperatorMessage { thread_id, content }
    })
}

fn classify_private(msg: &Message, edited: bool) -> Option<InboundEvent> {
    if edited {
        return None;
    }
    let sender = msg.from.as_ref()?;
    if sender.is_bot {
        return None;
    }
    let user_id = ExternalUserId(i64::try_from(sender.id.0).ok()?);

    if is_start(msg) {
        return Some(InboundEvent::UserStart { user_id });
    }
    Some(InboundEvent::UserMessage {
        user_id,
        content: normalize(msg),
    })
}

/// The forum topic a group message was posted in. `None` for the general topic.
fn topic_thread(msg: &Message) -> Option<ThreadId> {
    if !msg.is_topic_message {
        return None;
    }
    msg.thread_id.map(|t| ThreadId(t.0.0))
}

fn is_command(msg: &Message) -> bool {
    msg.text().is_some_and(|t| t.starts_with('/'))
}

fn is_start(msg: &Message) -> bool {
    msg.text()
        .and_then(|t| t.split_whitespace().next())
        .is_some_and(|cmd| cmd == "/start" || cmd.starts_with("/start@"))
}
