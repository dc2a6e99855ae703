//! 通知（リアルタイム配信）のインターフェース
//!
//! ユースケース層は [`EventPublisher`] にドメインイベントを渡すだけで、
//! 配信先の選定や WebSocket の扱いは Infrastructure 層のハブが担います。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    error::SessionError,
    event::{Channel, DomainEvent},
    value_object::{SessionId, Timestamp, UserId},
};

/// セッションへの送信チャンネル（シリアライズ済みフレーム）
///
/// 送信はブロックしないため、遅い・切断済みのクライアントが他への配信を止めることはありません。
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// ドメインイベントの発行
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// イベントを購読中のセッションへファンアウト（fire-and-forget）
    ///
    /// 個々のセッションへの送信失敗はログに記録して握りつぶします。
    async fn publish(&self, event: DomainEvent);
}

/// リアルタイムセッションとチャンネル購読の管理
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// セッションを登録し、`user:{user_id}` を自動購読する
    async fn register_session(
        &self,
        user_id: UserId,
        sender: PusherChannel,
        now: Timestamp,
    ) -> SessionId;

    /// セッションを登録解除し、全チャンネルの購読を外す（冪等）
    async fn unregister_session(&self, session_id: SessionId) -> bool;

    /// セッションの所有ユーザー
    async fn session_user(&self, session_id: SessionId) -> Option<UserId>;

    /// チャンネルを購読（既に購読済みなら `Ok(false)`）
    async fn subscribe(&self, session_id: SessionId, channel: Channel)
    -> Result<bool, SessionError>;

    /// チャンネルの購読を解除（未購読なら `Ok(false)`）
    async fn unsubscribe(
        &self,
        session_id: SessionId,
        channel: Channel,
    ) -> Result<bool, SessionError>;

    /// 特定のセッションにだけフレームを送信（コマンドへの応答用）
    ///
    /// セッションの送信チャンネルはハブだけが保持するため、登録解除するとソケットも閉じます。
    async fn push_to(&self, session_id: SessionId, frame: String) -> Result<(), SessionError>;

    /// ハートビート: 最終受信時刻を更新
    async fn touch(&self, session_id: SessionId, now: Timestamp) -> Result<(), SessionError>;

    /// `idle_before` より前から無通信のセッションを削除し、その ID を返す
    async fn reap_idle(&self, idle_before: Timestamp) -> Vec<SessionId>;
}
