//! チャンネル単位でセッションへ配信するリアルタイムハブ
//!
//! ## 責務
//!
//! - セッション（WebSocket 接続）と、その購読チャンネルの管理
//! - ドメインイベントのファンアウト（[`EventPublisher`] の実装）
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層で行われ、ハブは生成された `UnboundedSender` だけを受け取ります。
//! sender を保持するのはハブだけなので、セッションを登録解除するとソケットの送信側も閉じます。
//!
//! 配信はロックを保持したまま非ブロッキングの `send` で行うため、
//! 同じチャンネルに発行されたイベントは発行順にセッションへ届きます。
//!
//! ユースケースはコミット後に発行するので、発行順とコミット順は一致しません。
//! 削除済みの会話について遅れて届いたイベントは配信せずに捨てます。
//! 会話 ID は再利用されないため、削除済み ID の集合は単調に増えるだけです。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{
        Channel, ConversationId, DomainEvent, EventPublisher, PusherChannel, SessionError,
        SessionId, SessionRegistry, Timestamp, UserId,
    },
    infrastructure::dto::conversion::server_event,
};

struct SessionEntry {
    user_id: UserId,
    sender: PusherChannel,
    subscriptions: HashSet<Channel>,
    last_seen: Timestamp,
}

#[derive(Default)]
struct HubState {
    sessions: HashMap<SessionId, SessionEntry>,
    /// チャンネル → 購読中のセッション
    channels: HashMap<Channel, HashSet<SessionId>>,
    /// `connection-removed` を配信済みの会話
    removed_conversations: HashSet<ConversationId>,
}

impl HubState {
    fn add_subscription(&mut self, session_id: SessionId, channel: Channel) -> bool {
        let Some(entry) = self.sessions.get_mut(&session_id) else {
            return false;
        };
        let added = entry.subscriptions.insert(channel);
        self.channels.entry(channel).or_default().insert(session_id);
        added
    }

    fn remove_subscription(&mut self, session_id: SessionId, channel: Channel) -> bool {
        let removed = self
            .sessions
            .get_mut(&session_id)
            .map(|entry| entry.subscriptions.remove(&channel))
            .unwrap_or(false);
        if let Some(members) = self.channels.get_mut(&channel) {
            members.remove(&session_id);
            if members.is_empty() {
                self.channels.remove(&channel);
            }
        }
        removed
    }

    fn remove_session(&mut self, session_id: SessionId) -> Option<SessionEntry> {
        let entry = self.sessions.remove(&session_id)?;
        for channel in &entry.subscriptions {
            if let Some(members) = self.channels.get_mut(channel) {
                members.remove(&session_id);
                if members.is_empty() {
                    self.channels.remove(channel);
                }
            }
        }
        Some(entry)
    }

    /// チャンネルごと破棄し、購読していたセッションからも外す
    fn retire_channel(&mut self, channel: Channel) {
        let Some(members) = self.channels.remove(&channel) else {
            return;
        };
        for session_id in members {
            if let Some(entry) = self.sessions.get_mut(&session_id) {
                entry.subscriptions.remove(&channel);
            }
        }
    }
}

/// リアルタイムハブ
///
/// プロセス起動時に 1 度だけ生成し、`Arc` で UseCase と UI 層に注入します。
#[derive(Default)]
pub struct RealtimeHub {
    state: Mutex<HubState>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登録中のセッション数
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// チャンネルを購読中のセッション数
    pub async fn subscriber_count(&self, channel: Channel) -> usize {
        self.state
            .lock()
            .await
            .channels
            .get(&channel)
            .map(HashSet::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl EventPublisher for RealtimeHub {
    async fn publish(&self, event: DomainEvent) {
        // シリアライズはロックの外で、経路ごとに 1 回だけ
        let mut frames = Vec::new();
        for route in event.routes() {
            let Some(frame) = server_event(&event, route.kind) else {
                continue;
            };
            match serde_json::to_string(&frame) {
                Ok(json) => frames.push((route.channels, json)),
                Err(e) => tracing::warn!("Failed to serialize '{}': {}", event.name(), e),
            }
        }

        let mut state = self.state.lock().await;
        let conversation_id = event.conversation_id();
        if state.removed_conversations.contains(&conversation_id) {
            tracing::debug!(
                "Dropped '{}' for removed conversation {}",
                event.name(),
                conversation_id
            );
            return;
        }

        for (channels, json) in frames {
            // 同じ経路内で複数チャンネルを購読しているセッションにも 1 回だけ
            let mut seen = HashSet::new();
            let targets: Vec<SessionId> = channels
                .iter()
                .filter_map(|channel| state.channels.get(channel))
                .flatten()
                .copied()
                .filter(|session_id| seen.insert(*session_id))
                .collect();

            for session_id in targets {
                let Some(entry) = state.sessions.get(&session_id) else {
                    continue;
                };
                if let Err(e) = entry.sender.send(json.clone()) {
                    tracing::warn!(
                        "Failed to deliver '{}' to session {} (user {}): {}",
                        event.name(),
                        session_id,
                        entry.user_id,
                        e
                    );
                } else {
                    tracing::debug!(
                        "Delivered '{}' to session {} (user {})",
                        event.name(),
                        session_id,
                        entry.user_id
                    );
                }
            }
        }

        if let Some(channel) = event.retired_channel() {
            state.retire_channel(channel);
            state.removed_conversations.insert(conversation_id);
            tracing::debug!("Channel '{}' retired", channel);
        }
    }
}

#[async_trait]
impl SessionRegistry for RealtimeHub {
    async fn register_session(
        &self,
        user_id: UserId,
        sender: PusherChannel,
        now: Timestamp,
    ) -> SessionId {
        let session_id = SessionId::generate();
        let mut state = self.state.lock().await;
        state.sessions.insert(
            session_id,
            SessionEntry {
                user_id,
                sender,
                subscriptions: HashSet::new(),
                last_seen: now,
            },
        );
        state.add_subscription(session_id, Channel::User(user_id));
        tracing::debug!("Session {} registered for user {}", session_id, user_id);
        session_id
    }

    async fn unregister_session(&self, session_id: SessionId) -> bool {
        let removed = self.state.lock().await.remove_session(session_id);
        if let Some(entry) = &removed {
            tracing::debug!(
                "Session {} unregistered for user {}",
                session_id,
                entry.user_id
            );
        }
        removed.is_some()
    }

    async fn session_user(&self, session_id: SessionId) -> Option<UserId> {
        self.state
            .lock()
            .await
            .sessions
            .get(&session_id)
            .map(|entry| entry.user_id)
    }

    async fn subscribe(
        &self,
        session_id: SessionId,
        channel: Channel,
    ) -> Result<bool, SessionError> {
        let mut state = self.state.lock().await;
        if !state.sessions.contains_key(&session_id) {
            return Err(SessionError::UnknownSession(session_id));
        }
        let added = state.add_subscription(session_id, channel);
        tracing::debug!("Session {} subscribed to '{}'", session_id, channel);
        Ok(added)
    }

    async fn unsubscribe(
        &self,
        session_id: SessionId,
        channel: Channel,
    ) -> Result<bool, SessionError> {
        let mut state = self.state.lock().await;
        if !state.sessions.contains_key(&session_id) {
            return Err(SessionError::UnknownSession(session_id));
        }
        let removed = state.remove_subscription(session_id, channel);
        tracing::debug!("Session {} unsubscribed from '{}'", session_id, channel);
        Ok(removed)
    }

    async fn push_to(&self, session_id: SessionId, frame: String) -> Result<(), SessionError> {
        let state = self.state.lock().await;
        let entry = state
            .sessions
            .get(&session_id)
            .ok_or(SessionError::UnknownSession(session_id))?;
        entry
            .sender
            .send(frame)
            .map_err(|_| SessionError::Closed(session_id))
    }

    async fn touch(&self, session_id: SessionId, now: Timestamp) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        let entry = state
            .sessions
            .get_mut(&session_id)
            .ok_or(SessionError::UnknownSession(session_id))?;
        entry.last_seen = entry.last_seen.max(now);
        Ok(())
    }

    async fn reap_idle(&self, idle_before: Timestamp) -> Vec<SessionId> {
        let mut state = self.state.lock().await;
        let idle: Vec<SessionId> = state
            .sessions
            .iter()
            .filter(|(_, entry)| entry.last_seen < idle_before)
            .map(|(session_id, _)| *session_id)
            .collect();
        for session_id in &idle {
            state.remove_session(*session_id);
        }
        idle
    }
}
