//! InMemory Store 実装
//!
//! ドメイン層が定義する Repository trait の具体的な実装。
//! Graph / Conversation / Identity の全テーブルを 1 つの `Mutex` で保護するため、
//! 各メソッドのクリティカルセクションがそのまま 1 トランザクションになります。
//!
//! - 一意制約: 正規化されたペア（`UserPair`）をキーにした `HashMap` への挿入で保証
//! - ID: 単調増加のカウンタで採番し、削除後も再利用しない

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{
        ConnectionEdge, ConnectionWithProfile, Conversation, ConversationId,
        ConversationRepository, ConversationSummary, GraphRepository, Message, MessageContent,
        MessageId, RemovedConnection, RepositoryError, Timestamp, User, UserId, UserPair,
        UserRepository,
    },
    infrastructure::seed::UserSeed,
};

/// 全テーブル
#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    tokens: HashMap<String, UserId>,
    connections: HashMap<UserPair, ConnectionEdge>,
    conversations: BTreeMap<ConversationId, Conversation>,
    conversation_by_pair: HashMap<UserPair, ConversationId>,
    /// 会話ごとのメッセージ（作成順）
    messages: HashMap<ConversationId, Vec<Message>>,
    last_conversation_id: i64,
    last_message_id: i64,
}

impl Tables {
    fn next_conversation_id(&mut self) -> Result<ConversationId, RepositoryError> {
        self.last_conversation_id += 1;
        ConversationId::new(self.last_conversation_id).map_err(storage)
    }

    fn next_message_id(&mut self) -> Result<MessageId, RepositoryError> {
        self.last_message_id += 1;
        MessageId::new(self.last_message_id).map_err(storage)
    }

    /// 会話の存在と参加者をチェック
    fn participant_conversation(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<&Conversation, RepositoryError> {
        let conversation = self
            .conversations
            .get(&conversation_id)
            .ok_or(RepositoryError::ConversationNotFound(conversation_id))?;
        if !conversation.has_participant(user_id) {
            return Err(RepositoryError::NotAParticipant(user_id));
        }
        Ok(conversation)
    }
}

fn storage(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

/// インメモリ Store 実装
///
/// `UserRepository` / `GraphRepository` / `ConversationRepository` を 1 つの構造体で実装します。
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    /// 空の InMemoryStore を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// ユーザーを登録（同じ ID は上書き）
    pub async fn upsert_user(&self, seed: &UserSeed) {
        let mut tables = self.tables.lock().await;
        tables.tokens.retain(|_, id| *id != seed.id);
        tables.tokens.insert(seed.token.clone(), seed.id);
        tables.users.insert(seed.id, seed.to_user());
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_user(&self, user_id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.get(&user_id).cloned())
    }

    async fn find_user_id_by_token(&self, token: &str) -> Result<Option<UserId>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.tokens.get(token).copied())
    }
}

#[async_trait]
impl GraphRepository for InMemoryStore {
    async fn create_connection(
        &self,
        edge: &ConnectionEdge,
    ) -> Result<Conversation, RepositoryError> {
        let pair = edge.pair().map_err(storage)?;
        let mut tables = self.tables.lock().await;

        for user_id in pair.as_array() {
            if !tables.users.contains_key(&user_id) {
                return Err(RepositoryError::UserNotFound(user_id));
            }
        }
        if tables.connections.contains_key(&pair) {
            return Err(RepositoryError::AlreadyConnected);
        }

        let conversation = Conversation {
            id: tables.next_conversation_id()?,
            participant_ids: pair.as_array(),
            created_at: edge.created_at,
        };
        tables.connections.insert(pair, edge.clone());
        tables.conversation_by_pair.insert(pair, conversation.id);
        tables
            .conversations
            .insert(conversation.id, conversation.clone());

        Ok(conversation)
    }

    async fn remove_connection(
        &self,
        pair: UserPair,
    ) -> Result<RemovedConnection, RepositoryError> {
        let mut tables = self.tables.lock().await;

        if !tables.connections.contains_key(&pair) {
            return Err(RepositoryError::NotConnected);
        }
        let conversation_id = *tables.conversation_by_pair.get(&pair).ok_or_else(|| {
            RepositoryError::Storage(format!(
                "connection {}-{} has no conversation",
                pair.low(),
                pair.high()
            ))
        })?;

        // messages → conversation → edge
        let deleted_messages = tables
            .messages
            .remove(&conversation_id)
            .map(|messages| messages.len() as u64)
            .unwrap_or(0);
        tables.conversation_by_pair.remove(&pair);
        let conversation = tables
            .conversations
            .remove(&conversation_id)
            .ok_or(RepositoryError::ConversationNotFound(conversation_id))?;
        let edge = tables
            .connections
            .remove(&pair)
            .ok_or(RepositoryError::NotConnected)?;

        Ok(RemovedConnection {
            edge,
            conversation,
            deleted_messages,
        })
    }

    async fn find_connection(
        &self,
        pair: UserPair,
    ) -> Result<Option<ConnectionEdge>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.connections.get(&pair).cloned())
    }

    async fn list_connections(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConnectionWithProfile>, RepositoryError> {
        let tables = self.tables.lock().await;

        let mut connections: Vec<ConnectionWithProfile> = tables
            .connections
            .iter()
            .filter_map(|(pair, edge)| {
                let counterpart_id = pair.counterpart(user_id)?;
                let counterpart = tables.users.get(&counterpart_id)?.clone();
                Some(ConnectionWithProfile {
                    edge: edge.clone(),
                    counterpart,
                })
            })
            .collect();

        connections.sort_by_key(|c| (c.edge.created_at, c.counterpart.id));
        Ok(connections)
    }
}

#[async_trait]
impl ConversationRepository for InMemoryStore {
    async fn find_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.conversations.get(&conversation_id).cloned())
    }

    async fn append_message(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: MessageContent,
        now: Timestamp,
    ) -> Result<Message, RepositoryError> {
        let mut tables = self.tables.lock().await;
        tables.participant_conversation(conversation_id, sender_id)?;

        let previous = tables
            .messages
            .get(&conversation_id)
            .and_then(|messages| messages.last())
            .map(|m| m.created_at);
        let message = Message {
            id: tables.next_message_id()?,
            conversation_id,
            sender_id,
            content,
            created_at: now.strictly_after(previous),
        };
        tables
            .messages
            .entry(conversation_id)
            .or_default()
            .push(message.clone());

        Ok(message)
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
        requester_id: UserId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let tables = self.tables.lock().await;
        tables.participant_conversation(conversation_id, requester_id)?;

        let mut messages = tables
            .messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default();
        messages.sort_by_key(|m| (m.created_at, m.id));
        Ok(messages)
    }

    async fn list_conversations(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConversationSummary>, RepositoryError> {
        let tables = self.tables.lock().await;

        let mut summaries: Vec<ConversationSummary> = tables
            .conversations
            .values()
            .filter_map(|conversation| {
                let counterpart_id = conversation.counterpart_of(user_id)?;
                let counterpart = tables.users.get(&counterpart_id)?.clone();
                let last_message = tables
                    .messages
                    .get(&conversation.id)
                    .and_then(|messages| messages.last())
                    .cloned();
                Some(ConversationSummary {
                    conversation: conversation.clone(),
                    counterpart,
                    last_message,
                })
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.last_activity()
                .cmp(&a.last_activity())
                .then(b.conversation.id.cmp(&a.conversation.id))
        });
        Ok(summaries)
    }

    async fn clear_messages(
        &self,
        conversation_id: ConversationId,
        requester_id: UserId,
    ) -> Result<(Conversation, u64), RepositoryError> {
        let mut tables = self.tables.lock().await;
        let conversation = tables
            .participant_conversation(conversation_id, requester_id)?
            .clone();

        let deleted = tables
            .messages
            .remove(&conversation_id)
            .map(|messages| messages.len() as u64)
            .unwrap_or(0);
        Ok((conversation, deleted))
    }
}
