//! WebSocket frames.
//!
//! Both directions are internally tagged JSON objects, e.g.
//! `{"type":"send-message","conversation_id":3,"content":"hi"}`.

use serde::{Deserialize, Serialize};

/// Public profile of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEdgeDto {
    pub from_user_id: i64,
    pub to_user_id: i64,
    /// Unix timestamp in milliseconds
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationDto {
    pub id: i64,
    pub participant_ids: [i64; 2],
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub created_at: i64,
}

/// Frames pushed from the server to a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Sent once the session is registered; it is already on `user:{user_id}`
    SessionReady {
        session_id: String,
        user_id: i64,
        channels: Vec<String>,
    },
    Subscribed {
        channel: String,
    },
    Unsubscribed {
        channel: String,
    },
    ConnectionEstablished {
        edge: ConnectionEdgeDto,
        conversation: ConversationDto,
    },
    ConnectionRemoved {
        from_user_id: i64,
        to_user_id: i64,
        conversation_id: i64,
    },
    MessagePosted {
        conversation_id: i64,
        message: MessageDto,
    },
    /// Last-message summary for chat lists, sent on `user:*` channels
    ChatPreview {
        conversation_id: i64,
        participant_ids: [i64; 2],
        sender_id: i64,
        preview: String,
        created_at: i64,
    },
    ConversationCleared {
        conversation_id: i64,
        participant_ids: [i64; 2],
    },
    Pong {
        timestamp: i64,
    },
    Error {
        kind: String,
        message: String,
    },
}

/// Frames sent by a client over its session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientCommand {
    SubscribeConversation { conversation_id: i64 },
    UnsubscribeConversation { conversation_id: i64 },
    SubscribeUser { user_id: i64 },
    UnsubscribeUser { user_id: i64 },
    SendMessage { conversation_id: i64, content: String },
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_command_wire_format() {
        // テスト項目: クライアントのコマンドが kebab-case のタグで読み込まれる
        // given (前提条件):
        let json = r#"{"type":"send-message","conversation_id":3,"content":"hi"}"#;

        // when (操作):
        let command: ClientCommand = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        assert_eq!(
            command,
            ClientCommand::SendMessage {
                conversation_id: 3,
                content: "hi".to_string()
            }
        );
        let ping: ClientCommand = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(ping, ClientCommand::Ping);
    }

    #[test]
    fn test_server_event_wire_format() {
        // テスト項目: サーバーイベントは type タグ付きの JSON になり、フィールド名は snake_case のまま
        // given (前提条件):
        let event = ServerEvent::ConnectionRemoved {
            from_user_id: 1,
            to_user_id: 2,
            conversation_id: 7,
        };

        // when (操作):
        let value = serde_json::to_value(&event).unwrap();

        // then (期待する結果):
        assert_eq!(
            value,
            serde_json::json!({
                "type": "connection-removed",
                "from_user_id": 1,
                "to_user_id": 2,
                "conversation_id": 7
            })
        );
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        // テスト項目: 未知のコマンドはパースエラーになる
        // given (前提条件):
        let json = r#"{"type":"typing","conversation_id":3}"#;

        // when (操作):
        let result = serde_json::from_str::<ClientCommand>(json);

        // then (期待する結果):
        assert!(result.is_err());
    }
}
