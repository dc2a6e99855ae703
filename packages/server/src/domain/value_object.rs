//! 値オブジェクト
//!
//! ID・メッセージ本文・タイムスタンプなど、不変条件を型で保証する値を定義します。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValueObjectError;

/// メッセージ本文の最大文字数（デフォルト）
pub const MAX_CONTENT_LEN: usize = 4000;

/// ストアが採番する正の整数 ID を定義するマクロ
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            /// 正の整数から ID を生成
            pub fn new(value: i64) -> Result<Self, ValueObjectError> {
                if value <= 0 {
                    return Err(ValueObjectError::InvalidId { kind: $kind, value });
                }
                Ok(Self(value))
            }

            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = ValueObjectError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// ユーザー ID（Identity Store が管理）
    UserId,
    "user"
);
define_id!(
    /// 会話 ID（削除後も再利用されない）
    ConversationId,
    "conversation"
);
define_id!(
    /// メッセージ ID
    MessageId,
    "message"
);

/// メッセージ本文
///
/// 前後の空白を除いて空でないことを保証します。本文そのものは送信されたまま保持します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent(String);

impl MessageContent {
    /// デフォルトの最大長でメッセージ本文を生成
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        Self::with_max_len(value, MAX_CONTENT_LEN)
    }

    /// 最大長を指定してメッセージ本文を生成
    pub fn with_max_len(value: String, max_len: usize) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyContent);
        }
        let actual = value.chars().count();
        if actual > max_len {
            return Err(ValueObjectError::ContentTooLong {
                max: max_len,
                actual,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// チャット一覧用の短いプレビュー（文字数単位で切り詰め）
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.0.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{}…", head)
        } else {
            head
        }
    }
}

/// Unix タイムスタンプ（ミリ秒, UTC）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// 直前の時刻より必ず後になるタイムスタンプを返す
    ///
    /// 壁時計が巻き戻っても、会話内の作成時刻は狭義単調増加になります。
    pub fn strictly_after(self, previous: Option<Timestamp>) -> Timestamp {
        match previous {
            Some(prev) if prev.0 >= self.0 => Timestamp(prev.0 + 1),
            _ => self,
        }
    }
}

/// 順序を正規化したユーザーペア（`low < high`）
///
/// 接続は向きを持たないため、`(a, b)` と `(b, a)` は同じペアになります。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserPair {
    low: UserId,
    high: UserId,
}

impl UserPair {
    /// 異なる 2 ユーザーからペアを生成
    pub fn new(a: UserId, b: UserId) -> Result<Self, ValueObjectError> {
        if a == b {
            return Err(ValueObjectError::SelfConnection(a));
        }
        Ok(if a < b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        })
    }

    pub fn low(&self) -> UserId {
        self.low
    }

    pub fn high(&self) -> UserId {
        self.high
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.low == user_id || self.high == user_id
    }

    /// `user_id` から見た相手のユーザー ID
    pub fn counterpart(&self, user_id: UserId) -> Option<UserId> {
        if user_id == self.low {
            Some(self.high)
        } else if user_id == self.high {
            Some(self.low)
        } else {
            None
        }
    }

    pub fn as_array(&self) -> [UserId; 2] {
        [self.low, self.high]
    }
}

/// リアルタイム接続（ブラウザセッション）の ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(value: i64) -> UserId {
        UserId::new(value).unwrap()
    }

    #[test]
    fn test_id_rejects_non_positive_values() {
        // テスト項目: 0 以下の ID は生成できない
        // given (前提条件):
        let zero = 0;
        let negative = -3;

        // when (操作):
        let zero_result = UserId::new(zero);
        let negative_result = ConversationId::try_from(negative);

        // then (期待する結果):
        assert_eq!(
            zero_result,
            Err(ValueObjectError::InvalidId {
                kind: "user",
                value: 0
            })
        );
        assert_eq!(
            negative_result,
            Err(ValueObjectError::InvalidId {
                kind: "conversation",
                value: -3
            })
        );
    }

    #[test]
    fn test_id_deserialization_validates() {
        // テスト項目: JSON からの ID デシリアライズでもバリデーションされる
        // given (前提条件):
        let valid = "42";
        let invalid = "0";

        // when (操作):
        let parsed: Result<UserId, _> = serde_json::from_str(valid);
        let rejected: Result<UserId, _> = serde_json::from_str(invalid);

        // then (期待する結果):
        assert_eq!(parsed.unwrap(), uid(42));
        assert!(rejected.is_err());
    }

    #[test]
    fn test_message_content_rejects_whitespace_only() {
        // テスト項目: 空白のみの本文は EmptyContent になる
        // given (前提条件):
        let content = "   \n\t ".to_string();

        // when (操作):
        let result = MessageContent::new(content);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::EmptyContent));
    }

    #[test]
    fn test_message_content_keeps_original_text() {
        // テスト項目: 有効な本文は送信されたまま保持される
        // given (前提条件):
        let content = "  hi  ".to_string();

        // when (操作):
        let result = MessageContent::new(content).unwrap();

        // then (期待する結果):
        assert_eq!(result.as_str(), "  hi  ");
    }

    #[test]
    fn test_message_content_length_is_counted_in_chars() {
        // テスト項目: 最大長は文字数で判定される（マルチバイト文字を含む）
        // given (前提条件):
        let exact = "あいう".to_string();
        let over = "あいうえ".to_string();

        // when (操作):
        let ok = MessageContent::with_max_len(exact, 3);
        let too_long = MessageContent::with_max_len(over, 3);

        // then (期待する結果):
        assert!(ok.is_ok());
        assert_eq!(
            too_long,
            Err(ValueObjectError::ContentTooLong { max: 3, actual: 4 })
        );
    }

    #[test]
    fn test_message_content_preview() {
        // テスト項目: プレビューは指定文字数で切り詰められる
        // given (前提条件):
        let short = MessageContent::new("hello".to_string()).unwrap();
        let long = MessageContent::new("hello world".to_string()).unwrap();

        // when (操作):
        let short_preview = short.preview(5);
        let long_preview = long.preview(5);

        // then (期待する結果):
        assert_eq!(short_preview, "hello");
        assert_eq!(long_preview, "hello…");
    }

    #[test]
    fn test_timestamp_strictly_after_handles_clock_skew() {
        // テスト項目: 壁時計が巻き戻っても直前より後の時刻になる
        // given (前提条件):
        let previous = Some(Timestamp::new(1_000));

        // when (操作):
        let skewed = Timestamp::new(900).strictly_after(previous);
        let same = Timestamp::new(1_000).strictly_after(previous);
        let later = Timestamp::new(1_500).strictly_after(previous);
        let first = Timestamp::new(10).strictly_after(None);

        // then (期待する結果):
        assert_eq!(skewed, Timestamp::new(1_001));
        assert_eq!(same, Timestamp::new(1_001));
        assert_eq!(later, Timestamp::new(1_500));
        assert_eq!(first, Timestamp::new(10));
    }

    #[test]
    fn test_user_pair_is_order_independent() {
        // テスト項目: (a, b) と (b, a) は同じペアになる
        // given (前提条件):
        let a = uid(7);
        let b = uid(3);

        // when (操作):
        let ab = UserPair::new(a, b).unwrap();
        let ba = UserPair::new(b, a).unwrap();

        // then (期待する結果):
        assert_eq!(ab, ba);
        assert_eq!(ab.low(), b);
        assert_eq!(ab.high(), a);
        assert_eq!(ab.counterpart(a), Some(b));
        assert_eq!(ab.counterpart(uid(99)), None);
    }

    #[test]
    fn test_user_pair_rejects_self() {
        // テスト項目: 同じユーザー同士のペアは作れない
        // given (前提条件):
        let a = uid(1);

        // when (操作):
        let result = UserPair::new(a, a);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::SelfConnection(a)));
    }
}
