//! ドメイン層
//!
//! 接続グラフ・会話・メッセージのモデルと、それらを永続化・通知するための
//! インターフェース（trait）を定義します。具体的な実装は Infrastructure 層が提供します。

pub mod entity;
pub mod error;
pub mod event;
pub mod publisher;
pub mod repository;
pub mod value_object;

pub use entity::{
    ConnectionEdge, ConnectionWithProfile, Conversation, ConversationSummary, Message,
    RemovedConnection, User,
};
pub use error::{RepositoryError, SessionError, ValueObjectError};
pub use event::{Channel, DomainEvent, PayloadKind, Route};
pub use publisher::{EventPublisher, PusherChannel, SessionRegistry};
pub use repository::{ConversationRepository, GraphRepository, UserRepository};
pub use value_object::{
    ConversationId, MAX_CONTENT_LEN, MessageContent, MessageId, SessionId, Timestamp, UserId,
    UserPair,
};

#[cfg(test)]
pub use publisher::MockEventPublisher;
