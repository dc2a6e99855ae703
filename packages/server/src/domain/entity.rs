//! エンティティ
//!
//! User は Identity Store が所有する外部エンティティで、ここでは ID と公開プロフィールのみ扱います。

use super::{
    error::ValueObjectError,
    value_object::{ConversationId, MessageContent, MessageId, Timestamp, UserId, UserPair},
};

/// ユーザーの公開プロフィール
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
}

/// 接続（無向エッジ）
///
/// `from_user_id` は接続をリクエストした側ですが、ユーザー向けの意味論では向きを持ちません。
/// 一意性は正規化されたペア（[`UserPair`]）に対して保証されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEdge {
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub created_at: Timestamp,
}

impl ConnectionEdge {
    /// 新しい接続を生成（自分自身との接続はエラー）
    pub fn new(
        from_user_id: UserId,
        to_user_id: UserId,
        created_at: Timestamp,
    ) -> Result<Self, ValueObjectError> {
        UserPair::new(from_user_id, to_user_id)?;
        Ok(Self {
            from_user_id,
            to_user_id,
            created_at,
        })
    }

    pub fn pair(&self) -> Result<UserPair, ValueObjectError> {
        UserPair::new(self.from_user_id, self.to_user_id)
    }

    pub fn touches(&self, user_id: UserId) -> bool {
        self.from_user_id == user_id || self.to_user_id == user_id
    }
}

/// 会話（接続ごとに 1 つ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub participant_ids: [UserId; 2],
    pub created_at: Timestamp,
}

impl Conversation {
    pub fn has_participant(&self, user_id: UserId) -> bool {
        self.participant_ids.contains(&user_id)
    }

    /// `user_id` から見た相手の参加者
    pub fn counterpart_of(&self, user_id: UserId) -> Option<UserId> {
        match self.participant_ids {
            [a, b] if a == user_id => Some(b),
            [a, b] if b == user_id => Some(a),
            _ => None,
        }
    }
}

/// メッセージ（作成後は不変）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: MessageContent,
    pub created_at: Timestamp,
}

/// 接続一覧の 1 行（相手ユーザーのプロフィール付き）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionWithProfile {
    pub edge: ConnectionEdge,
    pub counterpart: User,
}

/// チャット一覧の 1 行（相手ユーザーと最新メッセージ付き）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub conversation: Conversation,
    pub counterpart: User,
    pub last_message: Option<Message>,
}

impl ConversationSummary {
    /// 並び替え用の最終アクティビティ時刻
    pub fn last_activity(&self) -> Timestamp {
        self.last_message
            .as_ref()
            .map(|m| m.created_at)
            .unwrap_or(self.conversation.created_at)
    }
}

/// 切断で削除された接続と会話
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedConnection {
    pub edge: ConnectionEdge,
    pub conversation: Conversation,
    pub deleted_messages: u64,
}
