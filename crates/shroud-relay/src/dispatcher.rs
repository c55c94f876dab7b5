// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay dispatcher: turns a [`ContentItem`] into exactly one outbound send.
//!
//! The anonymization tag is attached only on the user-to-operator path.
//! Replies travel back untagged so operators stay anonymous too. Delivery
//! failures are the [`DeliveryEngine`]'s concern; the dispatcher only
//! reports items it cannot route.

use std::sync::Arc;

use shroud_core::{
    ContentItem, ContentKind, Destination, ExternalUserId, OutboundSend, SendOperation,
    ShroudError, WorkspaceId,
};

use crate::delivery::{DeliveryEngine, DeliveryOutcome};
use crate::registry::Registration;
use crate::texts;

/// Builds the send for a user's message into their operator thread.
pub fn user_to_operator(
    workspace: WorkspaceId,
    registration: &Registration,
    item: &ContentItem,
) -> Result<OutboundSend, ShroudError> {
    let destination = Destination::Thread {
        workspace,
        thread: registration.thread_id,
    };
    let tag = texts::user_tag(&registration.anon_id);

    let operation = match item.kind {
        ContentKind::Text => SendOperation::Text {
            text: format!("{tag}\n{}", item.payload),
        },
        ContentKind::Unsupported => SendOperation::Text {
            text: format!("{tag}\n{}", texts::UNSUPPORTED),
        },
        kind => {
            let caption = match item.caption.as_deref() {
                Some(caption) if !caption.is_empty() => format!("{tag}\n{caption}"),
                _ => tag,
            };
            media_operation(kind, item, Some(caption))?
        }
    };
    Ok(OutboundSend::new(destination, operation))
}

/// Builds the send for an operator's reply to the bound user.
pub fn operator_to_user(
    user_id: ExternalUserId,
    item: &ContentItem,
) -> Result<OutboundSend, ShroudError> {
    let operation = match item.kind {
        ContentKind::Text => SendOperation::Text {
            text: item.payload.clone(),
        },
        ContentKind::Unsupported => SendOperation::Text {
            text: texts::UNSUPPORTED.to_string(),
        },
        kind => media_operation(kind, item, item.caption.clone())?,
    };
    Ok(OutboundSend::new(Destination::User(user_id), operation))
}

fn media_operation(
    kind: ContentKind,
    item: &ContentItem,
    caption: Option<String>,
) -> Result<SendOperation, ShroudError> {
    if item.payload.is_empty() {
        return Err(ShroudError::Routing(format!("{kind} item without a file id")));
    }
    let file_id = item.payload.clone();
    let operation = match kind {
        ContentKind::Photo => SendOperation::Photo { file_id, caption },
        ContentKind::Video => SendOperation::Video { file_id, caption },
        ContentKind::Document => SendOperation::Document { file_id, caption },
        ContentKind::Audio => SendOperation::Audio { file_id, caption },
        ContentKind::Voice => SendOperation::Voice { file_id, caption },
        ContentKind::Text | ContentKind::Unsupported => {
            return Err(ShroudError::Routing(format!("{kind} is not a media kind")));
        }
    };
    Ok(operation)
}

/// Routes relayed content through the delivery engine.
pub struct Dispatcher {
    engine: Arc<DeliveryEngine>,
    workspace: WorkspaceId,
}

impl Dispatcher {
    pub fn new(engine: Arc<DeliveryEngine>, workspace: WorkspaceId) -> Self {
        Self { engine, workspace }
    }

    /// Relays a user's message into their operator thread, tagged.
    pub async fn relay_user_to_operator(
        &self,
        registration: &Registration,
        item: &ContentItem,
    ) -> Result<DeliveryOutcome, ShroudError> {
        let send = user_to_operator(self.workspace, registration, item)?;
        Ok(self.engine.send(send).await)
    }

    /// Relays an operator's message to the bound user, untagged.
    pub async fn relay_operator_to_user(
        &self,
        user_id: ExternalUserId,
        item: &ContentItem,
    ) -> Result<DeliveryOutcome, ShroudError> {
        let send = operator_to_user(user_id, item)?;
        Ok(self.engine.send(send).await)
    }
}
