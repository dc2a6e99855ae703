//! Message formatting utilities for client display.

use chrono::{DateTime, Utc};
use kizuna_server::infrastructure::dto::{
    http::{ConnectionDto, ConversationSummaryDto, MessageDto},
    websocket::ServerEvent,
};
use kizuna_shared::time::timestamp_to_rfc3339;

use crate::domain::ViewState;

const RULE: &str = "------------------------------------------------------------";

/// `MM-DD HH:MM` in UTC, for list rows
fn short_time(timestamp_millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_millis)
        .map(|time| time.format("%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    pub fn format_welcome(view: &ViewState) -> String {
        format!(
            "\nSigned in as @{} (id {}). Type /help for commands.\n",
            view.me.username, view.me.id
        )
    }

    pub fn format_connections(connections: &[ConnectionDto]) -> String {
        let mut output = String::new();
        output.push_str("\nConnections:\n");
        if connections.is_empty() {
            output.push_str("(No connections)\n");
        }
        for connection in connections {
            output.push_str(&format!(
                "  @{} (id {}) since {}\n",
                connection.user.username,
                connection.user.id,
                short_time(connection.edge.created_at)
            ));
        }
        output
    }

    /// Format the chat list
    ///
    /// Each row shows the conversation id to pass to `/open`.
    pub fn format_chats(chats: &[ConversationSummaryDto], view: &ViewState) -> String {
        let mut output = String::new();
        output.push_str("\nChats:\n");
        if chats.is_empty() {
            output.push_str("(No conversations)\n");
        }
        for chat in chats {
            let marker = if view.open_conversation == Some(chat.conversation.id) {
                "*"
            } else {
                " "
            };
            let last = match &chat.last_message {
                Some(message) => format!(
                    "{} {}: {}",
                    short_time(message.created_at),
                    view.name_of(message.sender_id),
                    message.content
                ),
                None => "(no messages yet)".to_string(),
            };
            output.push_str(&format!(
                "{} [{}] @{}  {}\n",
                marker, chat.conversation.id, chat.counterpart.username, last
            ));
        }
        output
    }

    pub fn format_history(
        conversation_id: i64,
        messages: &[MessageDto],
        view: &ViewState,
    ) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n\n==== conversation {} ====\n", conversation_id));
        if messages.is_empty() {
            output.push_str("(No messages)\n");
        }
        for message in messages {
            output.push_str(&Self::format_line(message, view));
        }
        output.push_str("========================\n");
        output
    }

    fn format_line(message: &MessageDto, view: &ViewState) -> String {
        let me_suffix = if message.sender_id == view.me.id {
            " (me)"
        } else {
            ""
        };
        format!(
            "[{}] @{}{}: {}\n",
            timestamp_to_rfc3339(message.created_at),
            view.name_of(message.sender_id),
            me_suffix,
            message.content
        )
    }

    /// Format a chat message pushed live
    pub fn format_chat_message(message: &MessageDto, view: &ViewState) -> String {
        format!(
            "\n\n{}\n{}{}\n",
            RULE,
            Self::format_line(message, view),
            RULE
        )
    }

    /// Format a pushed event, `None` for frames that need no output
    pub fn format_event(event: &ServerEvent, view: &ViewState) -> Option<String> {
        match event {
            ServerEvent::SessionReady { channels, .. } => {
                Some(format!("\n(live on {})\n", channels.join(", ")))
            }
            ServerEvent::Subscribed { channel } => Some(format!("\n(following {})\n", channel)),
            ServerEvent::Unsubscribed { channel } => Some(format!("\n(left {})\n", channel)),
            ServerEvent::ConnectionEstablished { edge, conversation } => {
                let other = if edge.from_user_id == view.me.id {
                    edge.to_user_id
                } else {
                    edge.from_user_id
                };
                Some(format!(
                    "\n+ connected with {} (conversation {})\n",
                    view.name_of(other),
                    conversation.id
                ))
            }
            ServerEvent::ConnectionRemoved {
                from_user_id,
                to_user_id,
                conversation_id,
            } => {
                let other = if *from_user_id == view.me.id {
                    *to_user_id
                } else {
                    *from_user_id
                };
                Some(format!(
                    "\n- connection with {} removed (conversation {} deleted)\n",
                    view.name_of(other),
                    conversation_id
                ))
            }
            ServerEvent::MessagePosted { message, .. } => {
                Some(Self::format_chat_message(message, view))
            }
            ServerEvent::ChatPreview {
                conversation_id,
                sender_id,
                preview,
                ..
            } => {
                // The full message is already shown for the open conversation
                if view.open_conversation == Some(*conversation_id) {
                    return None;
                }
                Some(format!(
                    "\n[{}] @{}: {}\n",
                    conversation_id,
                    view.name_of(*sender_id),
                    preview
                ))
            }
            ServerEvent::ConversationCleared {
                conversation_id, ..
            } => Some(format!("\n(conversation {} was cleared)\n", conversation_id)),
            ServerEvent::Pong { .. } => None,
            ServerEvent::Error { kind, message } => Some(Self::format_error(kind, message)),
        }
    }

    pub fn format_error(kind: &str, message: &str) -> String {
        format!("\n! {}: {}\n", kind, message)
    }

    pub fn format_notice(text: &str) -> String {
        format!("\n{}\n", text)
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kizuna_server::infrastructure::dto::http::{ConnectionEdgeDto, ConversationDto, UserDto};

    fn view() -> ViewState {
        let mut view = ViewState::new(UserDto {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            bio: None,
        });
        view.learn_name(&bob());
        view
    }

    fn bob() -> UserDto {
        UserDto {
            id: 2,
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            bio: None,
        }
    }

    fn message(sender_id: i64, content: &str) -> MessageDto {
        MessageDto {
            id: 1,
            conversation_id: 5,
            sender_id,
            content: content.to_string(),
            created_at: 1672498800000,
        }
    }

    #[test]
    fn test_format_connections_empty() {
        // テスト項目: 接続が無い場合、その旨が表示される
        // given (前提条件):
        let connections = vec![];

        // when (操作):
        let result = MessageFormatter::format_connections(&connections);

        // then (期待する結果):
        assert!(result.contains("Connections:"));
        assert!(result.contains("(No connections)"));
    }

    #[test]
    fn test_format_chats_marks_open_conversation() {
        // テスト項目: チャット一覧で開いている会話に印が付き、最新メッセージが表示される
        // given (前提条件):
        let mut view = view();
        view.open_conversation = Some(5);
        let chats = vec![ConversationSummaryDto {
            conversation: ConversationDto {
                id: 5,
                participant_ids: [1, 2],
                created_at: 1672498700000,
            },
            counterpart: bob(),
            last_message: Some(message(2, "see you")),
        }];

        // when (操作):
        let result = MessageFormatter::format_chats(&chats, &view);

        // then (期待する結果):
        assert!(result.contains("* [5] @bob"));
        assert!(result.contains("bob: see you"));
        assert!(result.contains("12-31 15:00"));
    }

    #[test]
    fn test_format_history_marks_own_messages() {
        // テスト項目: 履歴で自分のメッセージにはマークが付く
        // given (前提条件):
        let view = view();
        let messages = vec![message(1, "hi"), message(2, "hello")];

        // when (操作):
        let result = MessageFormatter::format_history(5, &messages, &view);

        // then (期待する結果):
        assert!(result.contains("@alice (me): hi"));
        assert!(result.contains("@bob: hello"));
        assert!(result.contains("2022-12-31T15:00:00.000Z"));
    }

    #[test]
    fn test_preview_hidden_for_open_conversation() {
        // テスト項目: 開いている会話のプレビューは本文と重複するので表示しない
        // given (前提条件):
        let mut view = view();
        let preview = ServerEvent::ChatPreview {
            conversation_id: 5,
            participant_ids: [1, 2],
            sender_id: 2,
            preview: "see you".to_string(),
            created_at: 1672498800000,
        };

        // when (操作):
        let closed = MessageFormatter::format_event(&preview, &view);
        view.open_conversation = Some(5);
        let open = MessageFormatter::format_event(&preview, &view);

        // then (期待する結果):
        assert_eq!(closed, Some("\n[5] @bob: see you\n".to_string()));
        assert_eq!(open, None);
    }

    #[test]
    fn test_format_connection_established_names_counterpart() {
        // テスト項目: 接続通知には相手の名前が表示される
        // given (前提条件):
        let view = view();
        let event = ServerEvent::ConnectionEstablished {
            edge: ConnectionEdgeDto {
                from_user_id: 2,
                to_user_id: 1,
                created_at: 1672498800000,
            },
            conversation: ConversationDto {
                id: 5,
                participant_ids: [1, 2],
                created_at: 1672498800000,
            },
        };

        // when (操作):
        let result = MessageFormatter::format_event(&event, &view);

        // then (期待する結果):
        assert_eq!(
            result,
            Some("\n+ connected with bob (conversation 5)\n".to_string())
        );
    }

    #[test]
    fn test_format_raw_message() {
        // テスト項目: 生メッセージが正しくフォーマットされる
        // given (前提条件):
        let text = "unknown message format";

        // when (操作):
        let result = MessageFormatter::format_raw_message(text);

        // then (期待する結果):
        assert!(result.contains("unknown message format"));
        assert!(result.contains("Received:"));
    }
}
