//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! ## 作業単位
//!
//! 各メソッドは 1 つの作業単位（トランザクション）として実行されなければなりません。
//! 特に以下はストア側で保証します：
//!
//! - `create_connection`: 接続と会話の作成は分離して観測されない
//! - `remove_connection`: メッセージ → 参加者 → 会話 → 接続 の順で一括削除
//! - `append_message`: 会話の存在・参加者チェックと挿入が同じ作業単位

use async_trait::async_trait;

use super::{
    ConnectionEdge, ConnectionWithProfile, Conversation, ConversationId, ConversationSummary,
    Message, MessageContent, RemovedConnection, RepositoryError, Timestamp, User, UserId,
    UserPair,
};

/// Identity Store（外部コラボレーター）へのインターフェース
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// ID でユーザーを取得
    async fn find_user(&self, user_id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Bearer トークン（セッショントークン）をユーザー ID に解決
    async fn find_user_id_by_token(&self, token: &str) -> Result<Option<UserId>, RepositoryError>;
}

/// Graph Store
#[async_trait]
pub trait GraphRepository: Send + Sync {
    /// 接続を作成し、同じ作業単位で 2 人の会話を作成する
    ///
    /// ペアの一意制約に違反した場合は `AlreadyConnected`、
    /// どちらかのユーザーが存在しない場合は `UserNotFound` を返します。
    async fn create_connection(
        &self,
        edge: &ConnectionEdge,
    ) -> Result<Conversation, RepositoryError>;

    /// 接続と会話（メッセージ・参加者を含む）を一括削除する
    ///
    /// 接続が存在しない場合は `NotConnected` を返します。
    async fn remove_connection(&self, pair: UserPair)
    -> Result<RemovedConnection, RepositoryError>;

    /// ペアの接続を取得
    async fn find_connection(
        &self,
        pair: UserPair,
    ) -> Result<Option<ConnectionEdge>, RepositoryError>;

    /// ユーザーに接する全ての接続を、相手のプロフィール付きで取得
    async fn list_connections(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConnectionWithProfile>, RepositoryError>;
}

/// Conversation Store
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// 会話を取得
    async fn find_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError>;

    /// メッセージを追加する
    ///
    /// `created_at` は `now` と会話内の直前のメッセージから狭義単調増加になるよう
    /// ストアが決定します。会話が存在しなければ `ConversationNotFound`、
    /// 送信者が参加者でなければ `NotAParticipant` を返します。
    async fn append_message(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: MessageContent,
        now: Timestamp,
    ) -> Result<Message, RepositoryError>;

    /// 会話のメッセージ履歴を（作成順, ID 順）の昇順で取得
    async fn list_messages(
        &self,
        conversation_id: ConversationId,
        requester_id: UserId,
    ) -> Result<Vec<Message>, RepositoryError>;

    /// ユーザーの会話一覧を、最終アクティビティの新しい順で取得
    async fn list_conversations(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConversationSummary>, RepositoryError>;

    /// 会話のメッセージを全削除し、削除件数を返す（会話と接続は残す）
    async fn clear_messages(
        &self,
        conversation_id: ConversationId,
        requester_id: UserId,
    ) -> Result<(Conversation, u64), RepositoryError>;
}
