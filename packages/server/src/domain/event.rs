//! ドメインイベントと配信チャンネル
//!
//! Graph / Messaging の各ユースケースは状態変更のあとにドメインイベントを発行します。
//! どのチャンネルに何を届けるか（ルーティング）は副作用のない関数としてここで決まります。

use std::fmt;

use super::{
    entity::{ConnectionEdge, Conversation, Message},
    value_object::{ConversationId, UserId},
};

/// リアルタイム配信の論理トピック
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    /// `user:{id}` 接続時に自動で購読される
    User(UserId),
    /// `conversation:{id}` 会話ビューを開いている間だけ購読される
    Conversation(ConversationId),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::User(id) => write!(f, "user:{}", id),
            Channel::Conversation(id) => write!(f, "conversation:{}", id),
        }
    }
}

/// ドメインイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    /// 接続と会話が作成された
    ConnectionEstablished {
        edge: ConnectionEdge,
        conversation: Conversation,
    },
    /// 接続と会話（メッセージ含む）が削除された
    ConnectionRemoved {
        from_user_id: UserId,
        to_user_id: UserId,
        conversation_id: ConversationId,
    },
    /// メッセージが投稿された
    MessagePosted {
        conversation_id: ConversationId,
        participant_ids: [UserId; 2],
        message: Message,
    },
    /// 会話のメッセージが全削除された（会話と接続は残る）
    ConversationCleared {
        conversation_id: ConversationId,
        participant_ids: [UserId; 2],
    },
}

/// 配信するペイロードの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// イベント本体
    Event,
    /// チャット一覧用の最新メッセージプレビュー（`MessagePosted` のみ）
    ChatPreview,
}

/// 1 つの配信経路
///
/// 同じ経路の中では、複数チャンネルを購読しているセッションにも 1 回だけ届けます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub channels: Vec<Channel>,
    pub kind: PayloadKind,
}

impl DomainEvent {
    /// イベント名（ログ用）
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::ConnectionEstablished { .. } => "connection-established",
            DomainEvent::ConnectionRemoved { .. } => "connection-removed",
            DomainEvent::MessagePosted { .. } => "message-posted",
            DomainEvent::ConversationCleared { .. } => "conversation-cleared",
        }
    }

    /// イベントの配信経路を決定
    pub fn routes(&self) -> Vec<Route> {
        match self {
            DomainEvent::ConnectionEstablished { edge, .. } => vec![Route {
                channels: vec![
                    Channel::User(edge.from_user_id),
                    Channel::User(edge.to_user_id),
                ],
                kind: PayloadKind::Event,
            }],
            DomainEvent::ConnectionRemoved {
                from_user_id,
                to_user_id,
                conversation_id,
            } => vec![Route {
                channels: vec![
                    Channel::User(*from_user_id),
                    Channel::User(*to_user_id),
                    Channel::Conversation(*conversation_id),
                ],
                kind: PayloadKind::Event,
            }],
            DomainEvent::MessagePosted {
                conversation_id,
                participant_ids: [a, b],
                ..
            } => vec![
                Route {
                    channels: vec![Channel::Conversation(*conversation_id)],
                    kind: PayloadKind::Event,
                },
                Route {
                    channels: vec![Channel::User(*a), Channel::User(*b)],
                    kind: PayloadKind::ChatPreview,
                },
            ],
            DomainEvent::ConversationCleared {
                conversation_id,
                participant_ids: [a, b],
            } => vec![Route {
                channels: vec![
                    Channel::Conversation(*conversation_id),
                    Channel::User(*a),
                    Channel::User(*b),
                ],
                kind: PayloadKind::Event,
            }],
        }
    }

    /// 配信後に破棄すべきチャンネル（削除された会話のチャンネル）
    pub fn retired_channel(&self) -> Option<Channel> {
        match self {
            DomainEvent::ConnectionRemoved {
                conversation_id, ..
            } => Some(Channel::Conversation(*conversation_id)),
            _ => None,
        }
    }

    /// イベントが対象とする会話
    pub fn conversation_id(&self) -> ConversationId {
        match self {
            DomainEvent::ConnectionEstablished { conversation, .. } => conversation.id,
            DomainEvent::ConnectionRemoved {
                conversation_id, ..
            }
            | DomainEvent::MessagePosted {
                conversation_id, ..
            }
            | DomainEvent::ConversationCleared {
                conversation_id, ..
            } => *conversation_id,
        }
    }
}
