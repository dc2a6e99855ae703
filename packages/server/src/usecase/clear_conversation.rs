//! UseCase: 会話のメッセージ全削除
//!
//! 会話と接続は残したまま、メッセージだけを削除します。

use std::sync::Arc;

use crate::domain::{ConversationId, ConversationRepository, DomainEvent, EventPublisher, UserId};

use super::error::ClearConversationError;

/// 会話のメッセージ全削除のユースケース（参加者のみ）
pub struct ClearConversationUseCase {
    conversations: Arc<dyn ConversationRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl ClearConversationUseCase {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            conversations,
            publisher,
        }
    }

    /// 削除したメッセージ数を返す
    pub async fn execute(
        &self,
        requester_id: UserId,
        conversation_id: ConversationId,
    ) -> Result<u64, ClearConversationError> {
        let (conversation, deleted) = self
            .conversations
            .clear_messages(conversation_id, requester_id)
            .await?;
        tracing::info!(
            "User {} cleared conversation {} ({} messages)",
            requester_id,
            conversation_id,
            deleted
        );

        self.publisher
            .publish(DomainEvent::ConversationCleared {
                conversation_id,
                participant_ids: conversation.participant_ids,
            })
            .await;

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageContent, MockEventPublisher, Timestamp};
    use crate::usecase::testing::{connect, message_count, seeded_store, uid};

    #[tokio::test]
    async fn test_clear_conversation() {
        // テスト項目: メッセージが削除され、ConversationCleared が発行される
        // given (前提条件):
        let store = seeded_store().await;
        let conversation = connect(&store, 1, 2).await;
        store
            .append_message(
                conversation.id,
                uid(2),
                MessageContent::new("old".to_string()).unwrap(),
                Timestamp::new(500),
            )
            .await
            .unwrap();
        let expected = DomainEvent::ConversationCleared {
            conversation_id: conversation.id,
            participant_ids: [uid(1), uid(2)],
        };
        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .withf(move |event| event == &expected)
            .times(1)
            .returning(|_| ());
        let usecase = ClearConversationUseCase::new(store.clone(), Arc::new(publisher));

        // when (操作):
        let deleted = usecase.execute(uid(1), conversation.id).await.unwrap();

        // then (期待する結果):
        assert_eq!(deleted, 1);
        assert_eq!(message_count(&store, &conversation).await, 0);
        assert!(
            store
                .find_conversation(conversation.id)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_clear_by_outsider() {
        // テスト項目: 参加者以外の全削除は NotAParticipant になり、イベントは発行されない
        // given (前提条件):
        let store = seeded_store().await;
        let conversation = connect(&store, 1, 2).await;
        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().never();
        let usecase = ClearConversationUseCase::new(store, Arc::new(publisher));

        // when (操作):
        let result = usecase.execute(uid(3), conversation.id).await;

        // then (期待する結果):
        assert_eq!(result, Err(ClearConversationError::NotAParticipant(uid(3))));
    }
}
