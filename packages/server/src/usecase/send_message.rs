//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 本文のバリデーション、参加者チェック、MessagePosted の発行
//!
//! ### なぜこのテストが必要か
//! - 参加者以外・削除済みの会話への送信は、黙って成功してはならない
//! - 壁時計が巻き戻っても会話内の順序が保たれることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：メッセージ送信と通知
//! - 異常系：空・長すぎる本文、参加者以外、切断済みの会話
//! - 競合：通知の発行が切断の完了より遅れた場合

use std::sync::Arc;

use kizuna_shared::time::Clock;

use crate::domain::{
    ConversationId, ConversationRepository, DomainEvent, EventPublisher, MAX_CONTENT_LEN,
    Message, MessageContent, Timestamp, UserId,
};

use super::error::SendMessageError;

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// Repository（データアクセス層の抽象化）
    conversations: Arc<dyn ConversationRepository>,
    /// EventPublisher（リアルタイム通知の抽象化）
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    max_content_len: usize,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成（本文の最大長はデフォルト）
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            conversations,
            publisher,
            clock,
            max_content_len: MAX_CONTENT_LEN,
        }
    }

    /// 本文の最大文字数を変更
    pub fn with_max_content_len(mut self, max_content_len: usize) -> Self {
        self.max_content_len = max_content_len;
        self
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `sender_id` - 送信者
    /// * `conversation_id` - 送信先の会話
    /// * `content` - 本文（送信されたまま保存される）
    ///
    /// # Returns
    ///
    /// * `Ok(Message)` - 作成されたメッセージ（ID と作成時刻はストアが採番）
    /// * `Err(SendMessageError)` - 送信失敗
    pub async fn execute(
        &self,
        sender_id: UserId,
        conversation_id: ConversationId,
        content: String,
    ) -> Result<Message, SendMessageError> {
        // 1. 本文のバリデーション
        let content = MessageContent::with_max_len(content, self.max_content_len)?;

        // 2. 会話の参加者を取得（会話が無ければここで失敗）
        let conversation = self
            .conversations
            .find_conversation(conversation_id)
            .await?
            .ok_or(SendMessageError::ConversationNotFound(conversation_id))?;
        if !conversation.has_participant(sender_id) {
            return Err(SendMessageError::NotAParticipant(sender_id));
        }

        // 3. 追加（参加者チェックと挿入はストアの同じ作業単位で再度行われる）
        let now = Timestamp::new(self.clock.now_millis());
        let message = self
            .conversations
            .append_message(conversation_id, sender_id, content, now)
            .await?;
        tracing::debug!(
            "Message {} posted to conversation {} by user {}",
            message.id,
            conversation_id,
            sender_id
        );

        // 4. 会話チャンネルと両ユーザーに通知
        self.publisher
            .publish(DomainEvent::MessagePosted {
                conversation_id,
                participant_ids: conversation.participant_ids,
                message: message.clone(),
            })
            .await;

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GraphRepository, MockEventPublisher, SessionRegistry, UserPair};
    use crate::infrastructure::realtime::RealtimeHub;
    use crate::usecase::DisconnectUsersUseCase;
    use crate::usecase::testing::{connect, message_count, seeded_store, uid};
    use kizuna_shared::time::FixedClock;

    fn publisher_expecting(times: usize) -> Arc<MockEventPublisher> {
        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .withf(|event| matches!(event, DomainEvent::MessagePosted { .. }))
            .times(times)
            .returning(|_| ());
        Arc::new(publisher)
    }

    #[tokio::test]
    async fn test_send_message_success() {
        // テスト項目: メッセージが保存され、参加者 ID 付きの MessagePosted が発行される
        // given (前提条件):
        let store = seeded_store().await;
        let conversation = connect(&store, 1, 2).await;
        let mut publisher = MockEventPublisher::new();
        let conversation_id = conversation.id;
        publisher
            .expect_publish()
            .withf(move |event| {
                matches!(
                    event,
                    DomainEvent::MessagePosted { conversation_id: id, participant_ids, message }
                        if *id == conversation_id
                            && participant_ids.map(|p| p.value()) == [1, 2]
                            && message.content.as_str() == "hi"
                )
            })
            .times(1)
            .returning(|_| ());
        let usecase = SendMessageUseCase::new(
            store.clone(),
            Arc::new(publisher),
            Arc::new(FixedClock::new(2_000)),
        );

        // when (操作):
        let message = usecase
            .execute(uid(1), conversation.id, "hi".to_string())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(message.sender_id, uid(1));
        assert_eq!(message.created_at, Timestamp::new(2_000));
        assert_eq!(message_count(&store, &conversation).await, 1);
    }

    #[tokio::test]
    async fn test_send_empty_content() {
        // テスト項目: 空白のみの本文は EmptyContent になり、何も保存されない
        // given (前提条件):
        let store = seeded_store().await;
        let conversation = connect(&store, 1, 2).await;
        let usecase = SendMessageUseCase::new(
            store.clone(),
            publisher_expecting(0),
            Arc::new(FixedClock::new(0)),
        );

        // when (操作):
        let result = usecase
            .execute(uid(1), conversation.id, " \n\t ".to_string())
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(SendMessageError::EmptyContent));
        assert_eq!(message_count(&store, &conversation).await, 0);
    }

    #[tokio::test]
    async fn test_send_too_long_content() {
        // テスト項目: 最大文字数を超える本文は ContentTooLong になる
        // given (前提条件):
        let store = seeded_store().await;
        let conversation = connect(&store, 1, 2).await;
        let usecase = SendMessageUseCase::new(
            store,
            publisher_expecting(0),
            Arc::new(FixedClock::new(0)),
        )
        .with_max_content_len(5);

        // when (操作):
        let result = usecase
            .execute(uid(1), conversation.id, "こんにちは!".to_string())
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(SendMessageError::ContentTooLong { max: 5, actual: 6 })
        );
    }

    #[tokio::test]
    async fn test_send_by_outsider() {
        // テスト項目: 参加者以外の送信は NotAParticipant になる
        // given (前提条件):
        let store = seeded_store().await;
        let conversation = connect(&store, 1, 2).await;
        let usecase = SendMessageUseCase::new(
            store,
            publisher_expecting(0),
            Arc::new(FixedClock::new(0)),
        );

        // when (操作):
        let result = usecase
            .execute(uid(3), conversation.id, "let me in".to_string())
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(SendMessageError::NotAParticipant(uid(3))));
    }

    #[tokio::test]
    async fn test_send_after_disconnect() {
        // テスト項目: 切断済みの会話への送信は ConversationNotFound になる
        // given (前提条件):
        let store = seeded_store().await;
        let conversation = connect(&store, 1, 2).await;
        store
            .remove_connection(UserPair::new(uid(1), uid(2)).unwrap())
            .await
            .unwrap();
        let usecase = SendMessageUseCase::new(
            store,
            publisher_expecting(0),
            Arc::new(FixedClock::new(0)),
        );

        // when (操作):
        let result = usecase
            .execute(uid(1), conversation.id, "still there?".to_string())
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(SendMessageError::ConversationNotFound(conversation.id))
        );
    }

    #[tokio::test]
    async fn test_send_keeps_order_under_clock_skew() {
        // テスト項目: 時計が巻き戻っても送信順に作成時刻が増加する
        // given (前提条件):
        let store = seeded_store().await;
        let conversation = connect(&store, 1, 2).await;
        let clock = Arc::new(FixedClock::new(10_000));
        let usecase = SendMessageUseCase::new(store.clone(), publisher_expecting(3), clock.clone());

        // when (操作):
        let m1 = usecase
            .execute(uid(1), conversation.id, "m1".to_string())
            .await
            .unwrap();
        clock.set(3_000);
        let m2 = usecase
            .execute(uid(2), conversation.id, "m2".to_string())
            .await
            .unwrap();
        let m3 = usecase
            .execute(uid(1), conversation.id, "m3".to_string())
            .await
            .unwrap();

        // then (期待する結果):
        assert!(m1.created_at < m2.created_at);
        assert!(m2.created_at < m3.created_at);
        assert!(m1.id < m2.id && m2.id < m3.id);
    }

    /// 受け取ったイベントを保留し、`release` でまとめてハブへ流す EventPublisher
    struct HoldingPublisher {
        hub: Arc<RealtimeHub>,
        held: std::sync::Mutex<Vec<DomainEvent>>,
    }

    impl HoldingPublisher {
        async fn release(&self) {
            let events: Vec<DomainEvent> = std::mem::take(&mut *self.held.lock().unwrap());
            for event in events {
                self.hub.publish(event).await;
            }
        }
    }

    #[async_trait::async_trait]
    impl EventPublisher for HoldingPublisher {
        async fn publish(&self, event: DomainEvent) {
            self.held.lock().unwrap().push(event);
        }
    }

    fn frame_types(rx: &mut tokio::sync::mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut types = Vec::new();
        while let Ok(json) = rx.try_recv() {
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            types.push(value["type"].as_str().unwrap().to_string());
        }
        types
    }

    #[tokio::test]
    async fn test_message_notified_after_disconnect_is_not_delivered() {
        // テスト項目: 送信のコミット後、通知が切断の完了より遅れても、削除済み会話のプレビューは届かない
        // given (前提条件):
        let store = seeded_store().await;
        let conversation = connect(&store, 1, 2).await;
        let hub = Arc::new(RealtimeHub::new());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        hub.register_session(uid(1), tx, Timestamp::new(0)).await;
        let holding = Arc::new(HoldingPublisher {
            hub: hub.clone(),
            held: std::sync::Mutex::new(Vec::new()),
        });
        let send = SendMessageUseCase::new(
            store.clone(),
            holding.clone(),
            Arc::new(FixedClock::new(1_000)),
        );
        let disconnect = DisconnectUsersUseCase::new(store.clone(), hub.clone());

        // when (操作):
        send.execute(uid(2), conversation.id, "late".to_string())
            .await
            .unwrap();
        disconnect.execute(uid(1), uid(2)).await.unwrap();
        holding.release().await;

        // then (期待する結果):
        assert_eq!(frame_types(&mut rx), vec!["connection-removed"]);
    }
}
