//! SQLite Store 実装
//!
//! InMemory 実装と同じ Repository trait を `sqlx` の SQLite プールで実装します。
//! 複数文にまたがる操作（接続作成・切断）はトランザクションで 1 つの作業単位にまとめ、
//! 存在チェックと書き込みは同じ文（`INSERT ... SELECT ... WHERE`）の中で行います。

use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use sqlx::{
    Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
};

use crate::{
    domain::{
        ConnectionEdge, ConnectionWithProfile, Conversation, ConversationId,
        ConversationRepository, ConversationSummary, GraphRepository, Message, MessageContent,
        MessageId, RemovedConnection, RepositoryError, Timestamp, User, UserId, UserPair,
        UserRepository,
    },
    infrastructure::seed::UserSeed,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        bio TEXT,
        session_token TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS connections (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_low INTEGER NOT NULL REFERENCES users(id),
        user_high INTEGER NOT NULL REFERENCES users(id),
        from_user_id INTEGER NOT NULL,
        to_user_id INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        UNIQUE (user_low, user_high),
        CHECK (user_low < user_high)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS conversations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_low INTEGER NOT NULL,
        user_high INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        UNIQUE (user_low, user_high),
        FOREIGN KEY (user_low, user_high) REFERENCES connections(user_low, user_high)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS conversation_participants (
        conversation_id INTEGER NOT NULL REFERENCES conversations(id),
        user_id INTEGER NOT NULL REFERENCES users(id),
        PRIMARY KEY (conversation_id, user_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        conversation_id INTEGER NOT NULL REFERENCES conversations(id),
        sender_id INTEGER NOT NULL REFERENCES users(id),
        content TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_messages_conversation
        ON messages (conversation_id, created_at, id)
    "#,
];

fn storage(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn user_id(value: i64) -> Result<UserId, RepositoryError> {
    UserId::new(value).map_err(storage)
}

fn conversation_id(value: i64) -> Result<ConversationId, RepositoryError> {
    ConversationId::new(value).map_err(storage)
}

/// 保存済みの本文は長さ上限の設定変更に関係なく読み出せる
fn stored_content(value: String) -> Result<MessageContent, RepositoryError> {
    MessageContent::with_max_len(value, usize::MAX).map_err(storage)
}

fn edge_from_row(row: &SqliteRow) -> Result<ConnectionEdge, RepositoryError> {
    Ok(ConnectionEdge {
        from_user_id: user_id(row.try_get("from_user_id").map_err(storage)?)?,
        to_user_id: user_id(row.try_get("to_user_id").map_err(storage)?)?,
        created_at: Timestamp::new(row.try_get("created_at").map_err(storage)?),
    })
}

fn conversation_from_row(row: &SqliteRow) -> Result<Conversation, RepositoryError> {
    Ok(Conversation {
        id: conversation_id(row.try_get("id").map_err(storage)?)?,
        participant_ids: [
            user_id(row.try_get("user_low").map_err(storage)?)?,
            user_id(row.try_get("user_high").map_err(storage)?)?,
        ],
        created_at: Timestamp::new(row.try_get("created_at").map_err(storage)?),
    })
}

fn message_from_row(row: &SqliteRow) -> Result<Message, RepositoryError> {
    Ok(Message {
        id: MessageId::new(row.try_get("id").map_err(storage)?).map_err(storage)?,
        conversation_id: conversation_id(row.try_get("conversation_id").map_err(storage)?)?,
        sender_id: user_id(row.try_get("sender_id").map_err(storage)?)?,
        content: stored_content(row.try_get("content").map_err(storage)?)?,
        created_at: Timestamp::new(row.try_get("created_at").map_err(storage)?),
    })
}

/// `prefix` 付きの列からユーザーを組み立てる（JOIN 結果用）
fn user_from_row(row: &SqliteRow, prefix: &str) -> Result<User, RepositoryError> {
    let column = |name: &str| format!("{prefix}{name}");
    Ok(User {
        id: user_id(row.try_get(column("id").as_str()).map_err(storage)?)?,
        username: row.try_get(column("username").as_str()).map_err(storage)?,
        email: row.try_get(column("email").as_str()).map_err(storage)?,
        bio: row.try_get(column("bio").as_str()).map_err(storage)?,
    })
}

/// SQLite Store 実装
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// データベースに接続してスキーマを作成
    ///
    /// `url` は `sqlite://kizuna.db` のような接続文字列です。ファイルが無ければ作成します。
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(storage)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(storage)?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::info!("SQLite store ready: {}", url);
        Ok(store)
    }

    /// プロセス内だけで完結するインメモリデータベース
    ///
    /// 接続ごとに別のデータベースになるため、接続は 1 本だけ保持し続けます。
    pub async fn in_memory() -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(storage)?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(storage)?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), RepositoryError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(storage)?;
        }
        Ok(())
    }

    /// ユーザーを登録（同じ ID は上書き）
    pub async fn upsert_user(&self, seed: &UserSeed) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, bio, session_token)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (id) DO UPDATE SET
                username = excluded.username,
                email = excluded.email,
                bio = excluded.bio,
                session_token = excluded.session_token
            "#,
        )
        .bind(seed.id.value())
        .bind(&seed.username)
        .bind(&seed.email)
        .bind(&seed.bio)
        .bind(&seed.token)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    /// 会話の存在・参加者チェックの失敗理由を判定
    async fn classify_membership_failure(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> RepositoryError {
        let exists = sqlx::query("SELECT 1 FROM conversations WHERE id = ?1")
            .bind(conversation_id.value())
            .fetch_optional(&self.pool)
            .await;
        match exists {
            Ok(Some(_)) => RepositoryError::NotAParticipant(user_id),
            Ok(None) => RepositoryError::ConversationNotFound(conversation_id),
            Err(e) => storage(e),
        }
    }
}

#[async_trait]
impl UserRepository for SqliteStore {
    async fn find_user(&self, user_id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, username, email, bio FROM users WHERE id = ?1")
            .bind(user_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(|row| user_from_row(&row, "")).transpose()
    }

    async fn find_user_id_by_token(&self, token: &str) -> Result<Option<UserId>, RepositoryError> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE session_token = ?1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        id.map(self::user_id).transpose()
    }
}

#[async_trait]
impl GraphRepository for SqliteStore {
    async fn create_connection(
        &self,
        edge: &ConnectionEdge,
    ) -> Result<Conversation, RepositoryError> {
        let pair = edge.pair().map_err(storage)?;
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // 書き込みから始めてロックを確保する
        let inserted = sqlx::query(
            r#"
            INSERT INTO connections (user_low, user_high, from_user_id, to_user_id, created_at)
            SELECT ?1, ?2, ?3, ?4, ?5
            WHERE (SELECT COUNT(*) FROM users WHERE id IN (?1, ?2)) = 2
            "#,
        )
        .bind(pair.low().value())
        .bind(pair.high().value())
        .bind(edge.from_user_id.value())
        .bind(edge.to_user_id.value())
        .bind(edge.created_at.value())
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(result) if result.rows_affected() == 0 => {
                let known: Vec<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id IN (?1, ?2)")
                    .bind(pair.low().value())
                    .bind(pair.high().value())
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(storage)?;
                let missing = pair
                    .as_array()
                    .into_iter()
                    .find(|id| !known.contains(&id.value()))
                    .unwrap_or(pair.high());
                return Err(RepositoryError::UserNotFound(missing));
            }
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(RepositoryError::AlreadyConnected),
            Err(e) => return Err(storage(e)),
        }

        let row = sqlx::query(
            r#"
            INSERT INTO conversations (user_low, user_high, created_at)
            VALUES (?1, ?2, ?3)
            RETURNING id, user_low, user_high, created_at
            "#,
        )
        .bind(pair.low().value())
        .bind(pair.high().value())
        .bind(edge.created_at.value())
        .fetch_one(&mut *tx)
        .await
        .map_err(storage)?;
        let conversation = conversation_from_row(&row)?;

        for participant in pair.as_array() {
            sqlx::query(
                "INSERT INTO conversation_participants (conversation_id, user_id) VALUES (?1, ?2)",
            )
            .bind(conversation.id.value())
            .bind(participant.value())
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;
        Ok(conversation)
    }

    async fn remove_connection(
        &self,
        pair: UserPair,
    ) -> Result<RemovedConnection, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        let low = pair.low().value();
        let high = pair.high().value();

        // messages → participants → conversation → edge
        let deleted_messages = sqlx::query(
            r#"
            DELETE FROM messages WHERE conversation_id IN
                (SELECT id FROM conversations WHERE user_low = ?1 AND user_high = ?2)
            "#,
        )
        .bind(low)
        .bind(high)
        .execute(&mut *tx)
        .await
        .map_err(storage)?
        .rows_affected();

        sqlx::query(
            r#"
            DELETE FROM conversation_participants WHERE conversation_id IN
                (SELECT id FROM conversations WHERE user_low = ?1 AND user_high = ?2)
            "#,
        )
        .bind(low)
        .bind(high)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        let conversation = sqlx::query(
            r#"
            DELETE FROM conversations WHERE user_low = ?1 AND user_high = ?2
            RETURNING id, user_low, user_high, created_at
            "#,
        )
        .bind(low)
        .bind(high)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?;

        let edge = sqlx::query(
            r#"
            DELETE FROM connections WHERE user_low = ?1 AND user_high = ?2
            RETURNING from_user_id, to_user_id, created_at
            "#,
        )
        .bind(low)
        .bind(high)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?;

        let (edge, conversation) = match (edge, conversation) {
            (None, _) => return Err(RepositoryError::NotConnected),
            (Some(_), None) => {
                return Err(RepositoryError::Storage(format!(
                    "connection {low}-{high} has no conversation"
                )));
            }
            (Some(edge), Some(conversation)) => {
                (edge_from_row(&edge)?, conversation_from_row(&conversation)?)
            }
        };

        tx.commit().await.map_err(storage)?;
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
        let row = sqlx::query(
            r#"
            SELECT from_user_id, to_user_id, created_at FROM connections
            WHERE user_low = ?1 AND user_high = ?2
            "#,
        )
        .bind(pair.low().value())
        .bind(pair.high().value())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.map(|row| edge_from_row(&row)).transpose()
    }

    async fn list_connections(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConnectionWithProfile>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT c.from_user_id, c.to_user_id, c.created_at,
                   u.id AS u_id, u.username AS u_username, u.email AS u_email, u.bio AS u_bio
            FROM connections c
            JOIN users u
              ON u.id = CASE WHEN c.user_low = ?1 THEN c.user_high ELSE c.user_low END
            WHERE c.user_low = ?1 OR c.user_high = ?1
            ORDER BY c.created_at, u.id
            "#,
        )
        .bind(user_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter()
            .map(|row| {
                Ok(ConnectionWithProfile {
                    edge: edge_from_row(row)?,
                    counterpart: user_from_row(row, "u_")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ConversationRepository for SqliteStore {
    async fn find_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_low, user_high, created_at FROM conversations WHERE id = ?1",
        )
        .bind(conversation_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.map(|row| conversation_from_row(&row)).transpose()
    }

    async fn append_message(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: MessageContent,
        now: Timestamp,
    ) -> Result<Message, RepositoryError> {
        // 参加者チェック・時刻の単調増加・挿入を 1 文で行う
        let row = sqlx::query(
            r#"
            INSERT INTO messages (conversation_id, sender_id, content, created_at)
            SELECT ?1, ?2, ?3, MAX(?4, COALESCE(
                (SELECT MAX(created_at) FROM messages WHERE conversation_id = ?1) + 1, ?4))
            WHERE EXISTS (
                SELECT 1 FROM conversation_participants
                WHERE conversation_id = ?1 AND user_id = ?2
            )
            RETURNING id, conversation_id, sender_id, content, created_at
            "#,
        )
        .bind(conversation_id.value())
        .bind(sender_id.value())
        .bind(content.as_str())
        .bind(now.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        match row {
            Some(row) => message_from_row(&row),
            None => Err(self
                .classify_membership_failure(conversation_id, sender_id)
                .await),
        }
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
        requester_id: UserId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let membership: Option<(i64, Option<i64>)> = sqlx::query_as(
            r#"
            SELECT c.id, p.user_id FROM conversations c
            LEFT JOIN conversation_participants p
              ON p.conversation_id = c.id AND p.user_id = ?2
            WHERE c.id = ?1
            "#,
        )
        .bind(conversation_id.value())
        .bind(requester_id.value())
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?;

        match membership {
            None => return Err(RepositoryError::ConversationNotFound(conversation_id)),
            Some((_, None)) => return Err(RepositoryError::NotAParticipant(requester_id)),
            Some(_) => {}
        }

        let rows = sqlx::query(
            r#"
            SELECT id, conversation_id, sender_id, content, created_at FROM messages
            WHERE conversation_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(conversation_id.value())
        .fetch_all(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        rows.iter().map(message_from_row).collect()
    }

    async fn list_conversations(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConversationSummary>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.user_low, c.user_high, c.created_at,
                   u.id AS u_id, u.username AS u_username, u.email AS u_email, u.bio AS u_bio,
                   m.id AS m_id, m.sender_id AS m_sender_id, m.content AS m_content,
                   m.created_at AS m_created_at
            FROM conversations c
            JOIN users u
              ON u.id = CASE WHEN c.user_low = ?1 THEN c.user_high ELSE c.user_low END
            LEFT JOIN messages m ON m.id = (
                SELECT id FROM messages WHERE conversation_id = c.id
                ORDER BY created_at DESC, id DESC LIMIT 1
            )
            WHERE c.user_low = ?1 OR c.user_high = ?1
            "#,
        )
        .bind(user_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let conversation = conversation_from_row(row)?;
            let message_id: Option<i64> = row.try_get("m_id").map_err(storage)?;
            let last_message = match message_id {
                Some(id) => Some(Message {
                    id: MessageId::new(id).map_err(storage)?,
                    conversation_id: conversation.id,
                    sender_id: self::user_id(row.try_get("m_sender_id").map_err(storage)?)?,
                    content: stored_content(row.try_get("m_content").map_err(storage)?)?,
                    created_at: Timestamp::new(row.try_get("m_created_at").map_err(storage)?),
                }),
                None => None,
            };
            summaries.push(ConversationSummary {
                conversation,
                counterpart: user_from_row(row, "u_")?,
                last_message,
            });
        }

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
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let deleted = sqlx::query(
            r#"
            DELETE FROM messages WHERE conversation_id = ?1 AND EXISTS (
                SELECT 1 FROM conversation_participants
                WHERE conversation_id = ?1 AND user_id = ?2
            )
            "#,
        )
        .bind(conversation_id.value())
        .bind(requester_id.value())
        .execute(&mut *tx)
        .await
        .map_err(storage)?
        .rows_affected();

        let row = sqlx::query(
            r#"
            SELECT c.id, c.user_low, c.user_high, c.created_at FROM conversations c
            JOIN conversation_participants p ON p.conversation_id = c.id AND p.user_id = ?2
            WHERE c.id = ?1
            "#,
        )
        .bind(conversation_id.value())
        .bind(requester_id.value())
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?;

        let Some(row) = row else {
            tx.rollback().await.map_err(storage)?;
            return Err(self
                .classify_membership_failure(conversation_id, requester_id)
                .await);
        };
        let conversation = conversation_from_row(&row)?;

        tx.commit().await.map_err(storage)?;
        Ok((conversation, deleted))
    }
}
