//! ドメイン層のエラー型

use thiserror::Error;

use super::value_object::{ConversationId, SessionId, UserId};

/// 値オブジェクト生成時のバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    /// ID は正の整数でなければならない
    #[error("{kind} id must be positive (got {value})")]
    InvalidId { kind: &'static str, value: i64 },

    /// 空白のみ・空のメッセージ
    #[error("Message content must not be empty")]
    EmptyContent,

    /// 長すぎるメッセージ
    #[error("Message content is too long ({actual} > {max} characters)")]
    ContentTooLong { max: usize, actual: usize },

    /// 自分自身との接続
    #[error("User {0} cannot connect to themselves")]
    SelfConnection(UserId),
}

/// Repository 操作のエラー
///
/// ストアが検出する制約違反（一意制約・存在チェック・参加者チェック）は
/// すべて同じ作業単位の中で判定され、個別のバリアントとして返されます。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// 同じユーザーペアの接続が既に存在する（一意制約違反）
    #[error("Users are already connected")]
    AlreadyConnected,

    /// ユーザーペアの接続が存在しない
    #[error("Users are not connected")]
    NotConnected,

    /// 会話が存在しない（切断により削除済みを含む）
    #[error("Conversation {0} not found")]
    ConversationNotFound(ConversationId),

    /// 会話の参加者ではない
    #[error("User {0} is not a participant of this conversation")]
    NotAParticipant(UserId),

    /// ユーザーが存在しない
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// その他のストレージ障害
    #[error("Storage error: {0}")]
    Storage(String),
}

/// リアルタイムハブのセッション操作エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// 登録されていない（切断済み・タイムアウト済み）セッション
    #[error("Session {0} is not registered")]
    UnknownSession(SessionId),

    /// 送信チャンネルが閉じている（ソケット切断中）
    #[error("Session {0} is closed")]
    Closed(SessionId),
}
