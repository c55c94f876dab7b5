// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User- and operator-visible texts.

use shroud_core::AnonId;

/// Sent to the end user once their message reached the operator thread.
pub const ACK: &str = "Сообщение отправлено!";

/// Sent to the end user when their message went to the retry queue.
pub const DELAY_NOTICE: &str = "Сообщение будет доставлено, как только появится связь.";

/// Placeholder for content the relay cannot forward.
pub const UNSUPPORTED: &str = "Тип сообщения пока не поддерживается.";

/// Sent to the end user when their message could not be handled at all.
pub const APOLOGY: &str = "Произошла ошибка при отправке сообщения.";

/// Posted into the operator thread when a reply could not be routed.
pub const OPERATOR_REPLY_FAILED: &str = "Произошла ошибка при отправке ответа пользователю.";

/// Label of the operator thread created for a new user.
pub fn thread_label(anon_id: &AnonId) -> String {
    format!("Чат {}", anon_id.tag())
}

/// First line of every user message relayed to operators.
pub fn user_tag(anon_id: &AnonId) -> String {
    format!("Сообщение от {}:", anon_id.tag())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_and_label_use_four_chars() {
        let anon: AnonId = "a1b2c3d4-0000-4000-8000-000000000000".parse().unwrap();
        assert_eq!(thread_label(&anon), "Чат a1b2");
        assert_eq!(user_tag(&anon), "Сообщение от a1b2:");
    }
}
