//! UseCase: チャット一覧の取得

use std::sync::Arc;

use crate::domain::{ConversationRepository, ConversationSummary, UserId};

use super::error::ListError;

/// チャット一覧取得のユースケース（読み取り専用）
pub struct ListConversationsUseCase {
    conversations: Arc<dyn ConversationRepository>,
}

impl ListConversationsUseCase {
    pub fn new(conversations: Arc<dyn ConversationRepository>) -> Self {
        Self { conversations }
    }

    /// ユーザーの会話を、相手のプロフィールと最新メッセージ付きで新しい順に返す
    pub async fn execute(&self, user_id: UserId) -> Result<Vec<ConversationSummary>, ListError> {
        Ok(self.conversations.list_conversations(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageContent, Timestamp};
    use crate::usecase::testing::{connect, seeded_store, uid};

    #[tokio::test]
    async fn test_list_conversations_orders_by_activity() {
        // テスト項目: メッセージのあった会話が先頭に来る
        // given (前提条件):
        let store = seeded_store().await;
        let with_bob = connect(&store, 1, 2).await;
        let with_charlie = connect(&store, 1, 3).await;
        store
            .append_message(
                with_bob.id,
                uid(1),
                MessageContent::new("ping".to_string()).unwrap(),
                Timestamp::new(5_000),
            )
            .await
            .unwrap();
        let usecase = ListConversationsUseCase::new(store);

        // when (操作):
        let summaries = usecase.execute(uid(1)).await.unwrap();

        // then (期待する結果):
        let ids: Vec<_> = summaries.iter().map(|s| s.conversation.id).collect();
        assert_eq!(ids, vec![with_bob.id, with_charlie.id]);
        assert_eq!(summaries[1].counterpart.username, "charlie");
    }
}
