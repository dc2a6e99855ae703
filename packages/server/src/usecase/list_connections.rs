//! UseCase: 接続一覧の取得

use std::sync::Arc;

use crate::domain::{ConnectionWithProfile, GraphRepository, UserId};

use super::error::ListError;

/// 接続一覧取得のユースケース（読み取り専用）
pub struct ListConnectionsUseCase {
    graph: Arc<dyn GraphRepository>,
}

impl ListConnectionsUseCase {
    pub fn new(graph: Arc<dyn GraphRepository>) -> Self {
        Self { graph }
    }

    /// `user_id` に接する全ての接続を、相手のプロフィール付きで返す
    pub async fn execute(&self, user_id: UserId) -> Result<Vec<ConnectionWithProfile>, ListError> {
        Ok(self.graph.list_connections(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::testing::{connect, seeded_store, uid};

    #[tokio::test]
    async fn test_list_connections_is_symmetric() {
        // テスト項目: 接続は両端のユーザーの一覧に現れる
        // given (前提条件):
        let store = seeded_store().await;
        connect(&store, 1, 2).await;
        let usecase = ListConnectionsUseCase::new(store);

        // when (操作):
        let alice = usecase.execute(uid(1)).await.unwrap();
        let bob = usecase.execute(uid(2)).await.unwrap();
        let charlie = usecase.execute(uid(3)).await.unwrap();

        // then (期待する結果):
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].counterpart.id, uid(2));
        assert_eq!(bob.len(), 1);
        assert_eq!(bob[0].counterpart.id, uid(1));
        assert!(charlie.is_empty());
    }
}
