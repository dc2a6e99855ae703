//! UseCase: 会話履歴の取得

use std::sync::Arc;

use crate::domain::{ConversationId, ConversationRepository, Message, UserId};

use super::error::HistoryError;

/// 会話履歴取得のユースケース（参加者のみ）
pub struct GetHistoryUseCase {
    conversations: Arc<dyn ConversationRepository>,
}

impl GetHistoryUseCase {
    pub fn new(conversations: Arc<dyn ConversationRepository>) -> Self {
        Self { conversations }
    }

    /// 作成順（同時刻はメッセージ ID 順）でメッセージを返す
    pub async fn execute(
        &self,
        requester_id: UserId,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, HistoryError> {
        Ok(self
            .conversations
            .list_messages(conversation_id, requester_id)
            .await?)
    }
}
