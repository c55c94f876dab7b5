// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram endpoint for the Shroud relay.
//!
//! Implements [`MessagingEndpoint`] and [`EventSource`] for the Telegram Bot
//! API via teloxide. Operator threads are forum topics of one supergroup;
//! end users are addressed by their private chat.

pub mod normalize;

use async_trait::async_trait;
use shroud_config::model::TelegramConfig;
use shroud_core::error::ShroudError;
use shroud_core::traits::{EventSource, MessagingEndpoint, PluginAdapter};
use shroud_core::types::{
    AdapterType, Destination, HealthStatus, InboundEvent, MessageId, ThreadId, WorkspaceId,
};
use teloxide::prelude::*;
use teloxide::types::{
    FileId, InputFile, MessageId as TgMessageId, ThreadId as TgThreadId,
};
use teloxide::RequestError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Capacity of the buffer between the polling task and `receive()`.
const INBOUND_BUFFER: usize = 100;

/// Telegram endpoint implementing [`MessagingEndpoint`] and [`EventSource`].
pub struct TelegramEndpoint {
    bot: Bot,
    workspace: WorkspaceId,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundEvent>>,
    inbound_tx: mpsc::Sender<InboundEvent>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramEndpoint {
    /// Creates a new Telegram endpoint.
    ///
    /// Requires `config.bot_token` and `config.group_id` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, ShroudError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            ShroudError::Config("telegram.bot_token is required for the Telegram endpoint".into())
        })?;
        if token.trim().is_empty() {
            return Err(ShroudError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }
        let workspace = config.workspace().ok_or_else(|| {
            ShroudError::Config("telegram.group_id is required for the Telegram endpoint".into())
        })?;

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
        Ok(Self {
            bot: Bot::new(token),
            workspace,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

/// Splits a destination into the chat to send to and the forum topic, if any.
fn route(to: &Destination) -> (ChatId, Option<TgThreadId>) {
    match to {
        Destination::Thread { workspace, thread } => (
            ChatId(workspace.0),
            Some(TgThreadId(TgMessageId(thread.0))),
        ),
        Destination::User(user) => (ChatId(user.0), None),
    }
}

fn input_file(file_id: &str) -> InputFile {
    InputFile::file_id(FileId(file_id.to_string()))
}

fn sent_id(msg: &Message) -> MessageId {
    MessageId(msg.id.0.to_string())
}

/// Maps a Bot API failure into [`ShroudError`].
///
/// Rights problems (bot not an admin, topics disabled) become
/// [`ShroudError::PermissionDenied`]; everything else is an endpoint error.
fn map_request_error(action: &str, e: RequestError) -> ShroudError {
    let text = e.to_string();
    if matches!(e, RequestError::Api(_)) && is_permission_error(&text) {
        return ShroudError::PermissionDenied(format!("{action}: {text}"));
    }
    ShroudError::Endpoint {
        message: format!("failed to {action}: {text}"),
        source: Some(Box::new(e)),
    }
}

fn is_permission_error(text: &str) -> bool {
    let text = text.to_lowercase();
    text.contains("not enough rights")
        || text.contains("chat_admin_required")
        || text.contains("topics are disabled")
        || text.contains("chat is not a forum")
}

/// Classifies an update and forwards it to `receive()`.
async fn forward(
    tx: &mpsc::Sender<InboundEvent>,
    msg: &Message,
    workspace: WorkspaceId,
    edited: bool,
) {
    match normalize::classify(msg, workspace, edited) {
        Some(event) => {
            debug!(
                chat_id = msg.chat.id.0,
                event = event.label(),
                "inbound event"
            );
            if tx.send(event).await.is_err() {
                warn!("inbound channel closed, dropping event");
            }
        }
        None => {
            debug!(chat_id = msg.chat.id.0, edited, "ignoring update");
        }
    }
}

#[async_trait]
impl PluginAdapter for TelegramEndpoint {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Messaging
    }

    async fn health_check(&self) -> Result<HealthStatus, ShroudError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), ShroudError> {
        if let Some(handle) = &self.polling_handle {
            handle.abort();
        }
        debug!("Telegram endpoint shut down");
        Ok(())
    }
}

#[async_trait]
impl EventSource for TelegramEndpoint {
    async fn connect(&mut self) -> Result<(), ShroudError> {
        if self.polling_handle.is_some() {
            return Ok(());
        }

        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| map_request_error("reach the Bot API", e))?;
        info!(
            bot = me.username(),
            workspace = %self.workspace,
            "starting Telegram long polling"
        );

        let bot = self.bot.clone();
        let workspace = self.workspace;
        let new_tx = self.inbound_tx.clone();
        let edit_tx = self.inbound_tx.clone();

        let handle = tokio::spawn(async move {
            let handler = dptree::entry()
                .branch(Update::filter_message().endpoint(move |msg: Message| {
                    let tx = new_tx.clone();
                    async move {
                        forward(&tx, &msg, workspace, false).await;
                        respond(())
                    }
                }))
                .branch(
                    Update::filter_edited_message().endpoint(move |msg: Message| {
                        let tx = edit_tx.clone();
                        async move {
                            forward(&tx, &msg, workspace, true).await;
                            respond(())
                        }
                    }),
                );

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {}) // Silently ignore other update kinds
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, ShroudError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| ShroudError::Endpoint {
            message: "Telegram inbound channel closed".into(),
            source: None,
        })
    }
}

#[async_trait]
impl MessagingEndpoint for TelegramEndpoint {
    async fn create_thread(
        &self,
        workspace: WorkspaceId,
        label: &str,
    ) -> Result<ThreadId, ShroudError> {
        let topic = self
            .bot
            .create_forum_topic(ChatId(workspace.0), label)
            .await
            .map_err(|e| map_request_error("create forum topic", e))?;
        Ok(ThreadId(topic.thread_id.0.0))
    }

    async fn send_text(&self, to: &Destination, text: &str) -> Result<MessageId, ShroudError> {
        let (chat, thread) = route(to);
        let mut request = self.bot.send_message(chat, text);
        if let Some(thread) = thread {
            request = request.message_thread_id(thread);
        }
        let sent = request
            .await
            .map_err(|e| map_request_error("send message", e))?;
        Ok(sent_id(&sent))
    }

    async fn send_photo(
        &self,
        to: &Destination,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, ShroudError> {
        let (chat, thread) = route(to);
        let mut request = self.bot.send_photo(chat, input_file(file_id));
        if let Some(thread) = thread {
            request = request.message_thread_id(thread);
        }
        if let Some(caption) = caption {
            request = request.caption(caption);
        }
        let sent = request
            .await
            .map_err(|e| map_request_error("send photo", e))?;
        Ok(sent_id(&sent))
    }

    async fn send_video(
        &self,
        to: &Destination,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, ShroudError> {
        let (chat, thread) = route(to);
        let mut request = self.bot.send_video(chat, input_file(file_id));
        if let Some(thread) = thread {
            request = request.message_thread_id(thread);
        }
        if let Some(caption) = caption {
            request = request.caption(caption);
        }
        let sent = request
            .await
            .map_err(|e| map_request_error("send video", e))?;
        Ok(sent_id(&sent))
    }

    async fn send_document(
        &self,
        to: &Destination,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, ShroudError> {
        let (chat, thread) = route(to);
        let mut request = self.bot.send_document(chat, input_file(file_id));
        if let Some(thread) = thread {
            request = request.message_thread_id(thread);
        }
        if let Some(caption) = caption {
            request = request.caption(caption);
        }
        let sent = request
            .await
            .map_err(|e| map_request_error("send document", e))?;
        Ok(sent_id(&sent))
    }

    async fn send_audio(
        &self,
        to: &Destination,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, ShroudError> {
        let (chat, thread) = route(to);
        let mut request = self.bot.send_audio(chat, input_file(file_id));
        if let Some(thread) = thread {
            request = request.message_thread_id(thread);
        }
        if let Some(caption) = caption {
            request = request.caption(caption);
        }
        let sent = request
            .await
            .map_err(|e| map_request_error("send audio", e))?;
        Ok(sent_id(&sent))
    }

    async fn send_voice(
        &self,
        to: &Destination,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, ShroudError> {
        let (chat, thread) = route(to);
        let mut request = self.bot.send_voice(chat, input_file(file_id));
        if let Some(thread) = thread {
            request = request.message_thread_id(thread);
        }
        if let Some(caption) = caption {
            request = request.caption(caption);
        }
        let sent = request
            .await
            .map_err(|e| map_request_error("send voice", e))?;
        Ok(sent_id(&sent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shroud_core::types::ExternalUserId;

    fn config(token: Option<&str>, group: Option<i64>) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.map(str::to_string),
            group_id: group,
        }
    }

    #[test]
    fn new_requires_bot_token() {
        assert!(matches!(
            TelegramEndpoint::new(&config(None, Some(-100))),
            Err(ShroudError::Config(_))
        ));
    }

    #[test]
    fn new_rejects_blank_token() {
        assert!(TelegramEndpoint::new(&config(Some("  "), Some(-100))).is_err());
    }

    #[test]
    fn new_requires_group() {
        assert!(TelegramEndpoint::new(&config(Some("test:token"), None)).is_err());
    }

    #[test]
    fn new_accepts_valid_config() {
        let endpoint =
            TelegramEndpoint::new(&config(Some("123456:ABC-DEF1234ghIkl"), Some(-100))).unwrap();
        assert_eq!(endpoint.workspace, WorkspaceId(-100));
    }

    #[test]
    fn plugin_adapter_metadata() {
        let endpoint = TelegramEndpoint::new(&config(Some("test:token"), Some(-100))).unwrap();
        assert_eq!(endpoint.name(), "telegram");
        assert_eq!(endpoint.version(), semver::Version::new(0, 1, 0));
        assert_eq!(endpoint.adapter_type(), AdapterType::Messaging);
    }

    #[test]
    fn thread_destination_routes_to_topic() {
        let (chat, thread) = route(&Destination::Thread {
            workspace: WorkspaceId(-100_123),
            thread: ThreadId(77),
        });
        assert_eq!(chat, ChatId(-100_123));
        assert_eq!(thread, Some(TgThreadId(TgMessageId(77))));
    }

    #[test]
    fn user_destination_routes_to_private_chat() {
        let (chat, thread) = route(&Destination::User(ExternalUserId(42)));
        assert_eq!(chat, ChatId(42));
        assert_eq!(thread, None);
    }

    #[test]
    fn permission_texts_are_recognized() {
        assert!(is_permission_error(
            "Bad Request: not enough rights to create a topic"
        ));
        assert!(is_permission_error("Bad Request: CHAT_ADMIN_REQUIRED"));
        assert!(!is_permission_error("Too Many Requests: retry after 5"));
    }

    #[tokio::test]
    async fn receive_yields_forwarded_events() {
        let endpoint = TelegramEndpoint::new(&config(Some("test:token"), Some(-100))).unwrap();
        let make = |chat: serde_json::Value, text: &str| -> Message {
            serde_json::from_value(serde_json::json!({
                "message_id": 1,
                "date": 1700000000i64,
                "chat": chat,
                "from": { "id": 42u64, "is_bot": false, "first_name": "Test" },
                "text": text,
            }))
            .expect("failed to deserialize mock message")
        };

        let elsewhere = make(
            serde_json::json!({ "id": -555i64, "type": "supergroup", "title": "Other" }),
            "ignored",
        );
        let private = make(
            serde_json::json!({ "id": 42i64, "type": "private", "first_name": "Test" }),
            "hello",
        );
        forward(&endpoint.inbound_tx, &elsewhere, endpoint.workspace, false).await;
        forward(&endpoint.inbound_tx, &private, endpoint.workspace, false).await;

        assert_eq!(
            endpoint.receive().await.unwrap(),
            InboundEvent::UserMessage {
                user_id: ExternalUserId(42),
                content: shroud_core::types::ContentItem::text("hello"),
            }
        );
    }
}
