//! UseCase 層のエラー型
//!
//! Repository / ハブのエラーを、各ユースケースの呼び出し元が扱う種類に分類し直します。

use thiserror::Error;

use crate::domain::{ConversationId, RepositoryError, SessionError, UserId, ValueObjectError};

/// 接続作成のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// 自分自身との接続
    #[error("Cannot connect to yourself")]
    InvalidTarget,

    #[error("Users are already connected")]
    AlreadyConnected,

    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for ConnectError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::AlreadyConnected => Self::AlreadyConnected,
            RepositoryError::UserNotFound(id) => Self::UserNotFound(id),
            RepositoryError::Storage(message) => Self::Storage(message),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// 切断のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisconnectError {
    #[error("Cannot disconnect from yourself")]
    InvalidTarget,

    #[error("Users are not connected")]
    NotConnected,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for DisconnectError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotConnected => Self::NotConnected,
            RepositoryError::Storage(message) => Self::Storage(message),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// 一覧取得（接続一覧・チャット一覧・接続状態）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for ListError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Storage(message) => Self::Storage(message),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// メッセージ送信のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    #[error("Message content must not be empty")]
    EmptyContent,

    #[error("Message content is too long ({actual} > {max} characters)")]
    ContentTooLong { max: usize, actual: usize },

    #[error("Conversation {0} not found")]
    ConversationNotFound(ConversationId),

    #[error("User {0} is not a participant of this conversation")]
    NotAParticipant(UserId),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for SendMessageError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::ConversationNotFound(id) => Self::ConversationNotFound(id),
            RepositoryError::NotAParticipant(id) => Self::NotAParticipant(id),
            RepositoryError::Storage(message) => Self::Storage(message),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<ValueObjectError> for SendMessageError {
    fn from(e: ValueObjectError) -> Self {
        match e {
            ValueObjectError::EmptyContent => Self::EmptyContent,
            ValueObjectError::ContentTooLong { max, actual } => Self::ContentTooLong { max, actual },
            other => Self::Storage(other.to_string()),
        }
    }
}

/// 会話履歴取得のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("Conversation {0} not found")]
    ConversationNotFound(ConversationId),

    #[error("User {0} is not a participant of this conversation")]
    NotAParticipant(UserId),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for HistoryError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::ConversationNotFound(id) => Self::ConversationNotFound(id),
            RepositoryError::NotAParticipant(id) => Self::NotAParticipant(id),
            RepositoryError::Storage(message) => Self::Storage(message),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// 会話のメッセージ全削除のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClearConversationError {
    #[error("Conversation {0} not found")]
    ConversationNotFound(ConversationId),

    #[error("User {0} is not a participant of this conversation")]
    NotAParticipant(UserId),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for ClearConversationError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::ConversationNotFound(id) => Self::ConversationNotFound(id),
            RepositoryError::NotAParticipant(id) => Self::NotAParticipant(id),
            RepositoryError::Storage(message) => Self::Storage(message),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// チャンネル購読のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    #[error("Conversation {0} not found")]
    ConversationNotFound(ConversationId),

    #[error("User {0} is not a participant of this conversation")]
    NotAParticipant(UserId),

    /// 他のユーザーの user チャンネル
    #[error("Cannot subscribe to the channel of user {0}")]
    ForeignUserChannel(UserId),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for SubscribeError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::ConversationNotFound(id) => Self::ConversationNotFound(id),
            RepositoryError::NotAParticipant(id) => Self::NotAParticipant(id),
            RepositoryError::Storage(message) => Self::Storage(message),
            other => Self::Storage(other.to_string()),
        }
    }
}
