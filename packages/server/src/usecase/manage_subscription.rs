//! UseCase: チャンネル購読の管理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SubscriptionUseCase の購読・購読解除
//!
//! ### なぜこのテストが必要か
//! - conversation チャンネルは参加者だけ、user チャンネルは本人だけが購読できる
//!   （ハブに触れる前に UseCase で判定する）
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者による会話の購読、本人の user チャンネル
//! - 異常系：参加者以外、存在しない会話、他人の user チャンネル、登録解除済みセッション

use std::sync::Arc;

use crate::domain::{
    Channel, ConversationId, ConversationRepository, SessionError, SessionId, SessionRegistry,
    UserId,
};

use super::error::SubscribeError;

/// チャンネル購読のユースケース
pub struct SubscriptionUseCase {
    conversations: Arc<dyn ConversationRepository>,
    registry: Arc<dyn SessionRegistry>,
}

impl SubscriptionUseCase {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        registry: Arc<dyn SessionRegistry>,
    ) -> Self {
        Self {
            conversations,
            registry,
        }
    }

    async fn session_user(&self, session_id: SessionId) -> Result<UserId, SubscribeError> {
        self.registry
            .session_user(session_id)
            .await
            .ok_or(SubscribeError::Session(SessionError::UnknownSession(
                session_id,
            )))
    }

    /// 会話ビューを開いた時の購読（参加者のみ）
    ///
    /// 新たに購読した場合は `true`、既に購読済みなら `false`。
    pub async fn subscribe_conversation(
        &self,
        session_id: SessionId,
        conversation_id: ConversationId,
    ) -> Result<bool, SubscribeError> {
        let user_id = self.session_user(session_id).await?;
        let conversation = self
            .conversations
            .find_conversation(conversation_id)
            .await?
            .ok_or(SubscribeError::ConversationNotFound(conversation_id))?;
        if !conversation.has_participant(user_id) {
            tracing::warn!(
                "User {} tried to subscribe to conversation {}",
                user_id,
                conversation_id
            );
            return Err(SubscribeError::NotAParticipant(user_id));
        }

        Ok(self
            .registry
            .subscribe(session_id, Channel::Conversation(conversation_id))
            .await?)
    }

    /// 会話ビューを閉じた時の購読解除
    pub async fn unsubscribe_conversation(
        &self,
        session_id: SessionId,
        conversation_id: ConversationId,
    ) -> Result<bool, SubscribeError> {
        Ok(self
            .registry
            .unsubscribe(session_id, Channel::Conversation(conversation_id))
            .await?)
    }

    /// user チャンネルの購読（本人のみ）
    pub async fn subscribe_user(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<bool, SubscribeError> {
        let owner = self.session_user(session_id).await?;
        if owner != user_id {
            return Err(SubscribeError::ForeignUserChannel(user_id));
        }
        Ok(self
            .registry
            .subscribe(session_id, Channel::User(user_id))
            .await?)
    }

    pub async fn unsubscribe_user(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<bool, SubscribeError> {
        Ok(self
            .registry
            .unsubscribe(session_id, Channel::User(user_id))
            .await?)
    }
}
