//! UseCase 層
//!
//! 1 操作につき 1 つのユースケース構造体を定義します。
//! 依存（Repository・EventPublisher・Clock）はすべて `Arc<dyn Trait>` で注入します。

pub mod clear_conversation;
pub mod connect_users;
pub mod connection_status;
pub mod disconnect_users;
pub mod error;
pub mod get_history;
pub mod list_connections;
pub mod list_conversations;
pub mod manage_subscription;
pub mod send_message;

pub use clear_conversation::ClearConversationUseCase;
pub use connect_users::ConnectUsersUseCase;
pub use connection_status::ConnectionStatusUseCase;
pub use disconnect_users::DisconnectUsersUseCase;
pub use error::{
    ClearConversationError, ConnectError, DisconnectError, HistoryError, ListError,
    SendMessageError, SubscribeError,
};
pub use get_history::GetHistoryUseCase;
pub use list_connections::ListConnectionsUseCase;
pub use list_conversations::ListConversationsUseCase;
pub use manage_subscription::SubscriptionUseCase;
pub use send_message::SendMessageUseCase;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use crate::{
        domain::{
            ConnectionEdge, Conversation, ConversationRepository, GraphRepository, Timestamp,
            UserId,
        },
        infrastructure::{repository::InMemoryStore, seed::UserSeed},
    };

    pub fn uid(value: i64) -> UserId {
        UserId::new(value).unwrap()
    }

    /// alice(1), bob(2), charlie(3) が登録済みのストア
    pub async fn seeded_store() -> Arc<InMemoryStore> {
        let store = InMemoryStore::new();
        for (id, name) in [(1, "alice"), (2, "bob"), (3, "charlie")] {
            store
                .upsert_user(&UserSeed {
                    id: uid(id),
                    username: name.to_string(),
                    email: format!("{name}@example.com"),
                    bio: None,
                    token: format!("token-{name}"),
                })
                .await;
        }
        Arc::new(store)
    }

    /// イベントを発行せずにストアへ直接接続を作成
    pub async fn connect(store: &InMemoryStore, a: i64, b: i64) -> Conversation {
        let edge = ConnectionEdge::new(uid(a), uid(b), Timestamp::new(100)).unwrap();
        store.create_connection(&edge).await.unwrap()
    }

    /// 会話の現在のメッセージ数
    pub async fn message_count(store: &InMemoryStore, conversation: &Conversation) -> usize {
        store
            .list_messages(conversation.id, conversation.participant_ids[0])
            .await
            .map(|messages| messages.len())
            .unwrap_or(0)
    }
}
