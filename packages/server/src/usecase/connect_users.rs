//! UseCase: 接続作成処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectUsersUseCase::execute() メソッド
//! - 接続と会話の同時作成、ConnectionEstablished の発行
//!
//! ### なぜこのテストが必要か
//! - 「会話は接続が存在する時、かつその時に限り存在する」を保証する入口
//! - 失敗した操作はイベントを発行してはならない
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規接続
//! - 異常系：自分自身との接続、二重接続、存在しないユーザー

use std::sync::Arc;

use kizuna_shared::time::Clock;

use crate::domain::{
    ConnectionEdge, Conversation, DomainEvent, EventPublisher, GraphRepository, Timestamp, UserId,
};

use super::error::ConnectError;

/// 接続作成のユースケース
pub struct ConnectUsersUseCase {
    /// Repository（データアクセス層の抽象化）
    graph: Arc<dyn GraphRepository>,
    /// EventPublisher（リアルタイム通知の抽象化）
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
}

impl ConnectUsersUseCase {
    /// 新しい ConnectUsersUseCase を作成
    pub fn new(
        graph: Arc<dyn GraphRepository>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            graph,
            publisher,
            clock,
        }
    }

    /// 接続作成を実行
    ///
    /// # Arguments
    ///
    /// * `requester_id` - 接続をリクエストしたユーザー
    /// * `target_id` - 接続先のユーザー
    ///
    /// # Returns
    ///
    /// * `Ok((ConnectionEdge, Conversation))` - 作成された接続と会話
    /// * `Err(ConnectError)` - 接続失敗（状態は変更されない）
    pub async fn execute(
        &self,
        requester_id: UserId,
        target_id: UserId,
    ) -> Result<(ConnectionEdge, Conversation), ConnectError> {
        // 1. 自分自身との接続を拒否
        let now = Timestamp::new(self.clock.now_millis());
        let edge = ConnectionEdge::new(requester_id, target_id, now)
            .map_err(|_| ConnectError::InvalidTarget)?;

        // 2. 接続と会話を 1 つの作業単位で作成（一意制約はストアが保証）
        let conversation = self.graph.create_connection(&edge).await?;
        tracing::info!(
            "User {} connected to user {} (conversation {})",
            requester_id,
            target_id,
            conversation.id
        );

        // 3. 両ユーザーに通知
        self.publisher
            .publish(DomainEvent::ConnectionEstablished {
                edge: edge.clone(),
                conversation: conversation.clone(),
            })
            .await;

        Ok((edge, conversation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConversationRepository, MockEventPublisher, UserPair};
    use crate::usecase::testing::{seeded_store, uid};
    use kizuna_shared::time::FixedClock;

    fn create_usecase(
        store: Arc<crate::infrastructure::repository::InMemoryStore>,
        publisher: MockEventPublisher,
    ) -> ConnectUsersUseCase {
        ConnectUsersUseCase::new(store, Arc::new(publisher), Arc::new(FixedClock::new(1_000)))
    }

    #[tokio::test]
    async fn test_connect_success() {
        // テスト項目: 接続と会話が作成され、ConnectionEstablished が 1 回発行される
        // given (前提条件):
        let store = seeded_store().await;
        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .withf(|event| {
                matches!(
                    event,
                    DomainEvent::ConnectionEstablished { edge, conversation }
                        if edge.from_user_id.value() == 2
                            && edge.to_user_id.value() == 1
                            && conversation.participant_ids.map(|id| id.value()) == [1, 2]
                )
            })
            .times(1)
            .returning(|_| ());
        let usecase = create_usecase(store.clone(), publisher);

        // when (操作):
        let result = usecase.execute(uid(2), uid(1)).await;

        // then (期待する結果):
        let (edge, conversation) = result.unwrap();
        assert_eq!(edge.created_at, Timestamp::new(1_000));
        assert_eq!(conversation.created_at, Timestamp::new(1_000));
        let pair = UserPair::new(uid(1), uid(2)).unwrap();
        assert_eq!(store.find_connection(pair).await.unwrap(), Some(edge));
    }

    #[tokio::test]
    async fn test_connect_to_self_is_invalid_target() {
        // テスト項目: 自分自身との接続は InvalidTarget になり、イベントは発行されない
        // given (前提条件):
        let store = seeded_store().await;
        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().never();
        let usecase = create_usecase(store, publisher);

        // when (操作):
        let result = usecase.execute(uid(1), uid(1)).await;

        // then (期待する結果):
        assert_eq!(result, Err(ConnectError::InvalidTarget));
    }

    #[tokio::test]
    async fn test_connect_twice_is_already_connected() {
        // テスト項目: 同じペアの 2 回目の接続は AlreadyConnected になり、イベントは 1 回だけ
        // given (前提条件):
        let store = seeded_store().await;
        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().times(1).returning(|_| ());
        let usecase = create_usecase(store.clone(), publisher);
        usecase.execute(uid(1), uid(2)).await.unwrap();

        // when (操作):
        let result = usecase.execute(uid(2), uid(1)).await;

        // then (期待する結果):
        assert_eq!(result, Err(ConnectError::AlreadyConnected));
        assert_eq!(store.list_connections(uid(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_to_unknown_user() {
        // テスト項目: 存在しないユーザーとの接続は UserNotFound になる
        // given (前提条件):
        let store = seeded_store().await;
        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().never();
        let usecase = create_usecase(store, publisher);

        // when (操作):
        let result = usecase.execute(uid(1), uid(404)).await;

        // then (期待する結果):
        assert_eq!(result, Err(ConnectError::UserNotFound(uid(404))));
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_connects() {
        // テスト項目: 同じペアへの同時接続はちょうど 1 つだけ成功する
        // given (前提条件):
        let store = seeded_store().await;
        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().times(1).returning(|_| ());
        let usecase = Arc::new(create_usecase(store.clone(), publisher));

        // when (操作):
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let usecase = usecase.clone();
                let (a, b) = if i % 2 == 0 { (1, 2) } else { (2, 1) };
                tokio::spawn(async move { usecase.execute(uid(a), uid(b)).await })
            })
            .collect();
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        // then (期待する結果):
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter(|r| r.is_err())
                .all(|r| r == &Err(ConnectError::AlreadyConnected))
        );
        assert_eq!(store.list_conversations(uid(2)).await.unwrap().len(), 1);
    }
}
