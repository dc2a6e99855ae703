//! UseCase: 接続状態の確認

use std::sync::Arc;

use crate::domain::{GraphRepository, UserId, UserPair};

use super::error::ListError;

/// 2 ユーザー間の接続状態を確認するユースケース（読み取り専用）
pub struct ConnectionStatusUseCase {
    graph: Arc<dyn GraphRepository>,
}

impl ConnectionStatusUseCase {
    pub fn new(graph: Arc<dyn GraphRepository>) -> Self {
        Self { graph }
    }

    /// 接続していれば `true`（自分自身とは常に `false`）
    pub async fn execute(&self, requester_id: UserId, target_id: UserId) -> Result<bool, ListError> {
        let Ok(pair) = UserPair::new(requester_id, target_id) else {
            return Ok(false);
        };
        Ok(self.graph.find_connection(pair).await?.is_some())
    }
}
