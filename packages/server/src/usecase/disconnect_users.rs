//! UseCase: 切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectUsersUseCase::execute() メソッド
//! - 接続・会話・メッセージの連鎖削除と ConnectionRemoved の発行
//!
//! ### どのような状況を想定しているか
//! - 正常系：メッセージのある会話を持つ接続の切断
//! - 異常系：接続していないペア、二重切断（同時実行を含む）

use std::sync::Arc;

use crate::domain::{
    DomainEvent, EventPublisher, GraphRepository, RemovedConnection, UserId, UserPair,
};

use super::error::DisconnectError;

/// 切断のユースケース
pub struct DisconnectUsersUseCase {
    graph: Arc<dyn GraphRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl DisconnectUsersUseCase {
    pub fn new(graph: Arc<dyn GraphRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { graph, publisher }
    }

    /// 切断を実行
    ///
    /// messages → participants → conversation → edge の順に 1 つの作業単位で削除し、
    /// 成功した場合だけ両ユーザー（と会話チャンネル）に通知します。
    pub async fn execute(
        &self,
        requester_id: UserId,
        target_id: UserId,
    ) -> Result<RemovedConnection, DisconnectError> {
        let pair =
            UserPair::new(requester_id, target_id).map_err(|_| DisconnectError::InvalidTarget)?;

        let removed = self.graph.remove_connection(pair).await?;
        tracing::info!(
            "User {} disconnected from user {} (conversation {}, {} messages deleted)",
            requester_id,
            target_id,
            removed.conversation.id,
            removed.deleted_messages
        );

        self.publisher
            .publish(DomainEvent::ConnectionRemoved {
                from_user_id: requester_id,
                to_user_id: target_id,
                conversation_id: removed.conversation.id,
            })
            .await;

        Ok(removed)
    }
}
