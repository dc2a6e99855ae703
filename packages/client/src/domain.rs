//! Domain logic for client-side operations.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use std::collections::HashMap;

use reqwest::Url;

use kizuna_server::infrastructure::dto::{
    http::{ConnectionDto, UserDto},
    websocket::ServerEvent,
};

use crate::error::ClientError;

/// What the terminal is showing, kept across reconnects
#[derive(Debug, Clone)]
pub struct ViewState {
    pub me: UserDto,
    /// Conversation followed live, if any
    pub open_conversation: Option<i64>,
    names: HashMap<i64, String>,
}

impl ViewState {
    pub fn new(me: UserDto) -> Self {
        let mut names = HashMap::new();
        names.insert(me.id, me.username.clone());
        Self {
            me,
            open_conversation: None,
            names,
        }
    }

    /// Remember the usernames of the given connections
    pub fn learn_names(&mut self, connections: &[ConnectionDto]) {
        for connection in connections {
            self.names
                .insert(connection.user.id, connection.user.username.clone());
        }
    }

    pub fn learn_name(&mut self, user: &UserDto) {
        self.names.insert(user.id, user.username.clone());
    }

    /// Display name of a user, `user#<id>` when unknown
    pub fn name_of(&self, user_id: i64) -> String {
        self.names
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| format!("user#{}", user_id))
    }

    /// Update the view for a pushed event.
    ///
    /// Returns `true` when the open conversation no longer exists and was closed.
    pub fn apply_event(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::ConnectionRemoved {
                conversation_id, ..
            } if self.open_conversation == Some(*conversation_id) => {
                self.open_conversation = None;
                true
            }
            _ => false,
        }
    }
}

/// Check if the client should exit immediately based on the error type.
///
/// A rejected token will be rejected again, so retrying is pointless.
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(error, ClientError::Unauthorized | ClientError::InvalidUrl(_))
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    // Don't reconnect if the error requires immediate exit
    if should_exit_immediately(error) {
        return false;
    }

    current_attempt < max_attempts
}

/// Build the WebSocket endpoint from the HTTP base URL.
///
/// `http://host:8080` becomes `ws://host:8080/ws?token=...`, `https` becomes `wss`.
/// The token is percent-encoded as a query value.
pub fn websocket_url(base_url: &str, token: &str) -> Result<String, ClientError> {
    let invalid = || ClientError::InvalidUrl(base_url.to_string());
    let mut url = Url::parse(base_url).map_err(|_| invalid())?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        _ => return Err(invalid()),
    };
    url.set_scheme(scheme).map_err(|_| invalid())?;
    let path = format!("{}/ws", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_fragment(None);
    url.query_pairs_mut().clear().append_pair("token", token);
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn me() -> UserDto {
        UserDto {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            bio: None,
        }
    }

    #[test]
    fn test_view_closes_removed_conversation() {
        // テスト項目: 開いている会話の接続が削除されると、会話ビューが閉じる
        // given (前提条件):
        let mut view = ViewState::new(me());
        view.open_conversation = Some(7);
        let other = ServerEvent::ConnectionRemoved {
            from_user_id: 1,
            to_user_id: 3,
            conversation_id: 8,
        };
        let removed = ServerEvent::ConnectionRemoved {
            from_user_id: 2,
            to_user_id: 1,
            conversation_id: 7,
        };

        // when (操作):
        let closed_by_other = view.apply_event(&other);
        let closed = view.apply_event(&removed);

        // then (期待する結果):
        assert!(!closed_by_other);
        assert!(closed);
        assert_eq!(view.open_conversation, None);
    }

    #[test]
    fn test_view_names() {
        // テスト項目: 既知のユーザーは名前、未知のユーザーは ID で表示される
        // given (前提条件):
        let mut view = ViewState::new(me());
        view.learn_name(&UserDto {
            id: 2,
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            bio: None,
        });

        // when (操作):
        let names = [view.name_of(1), view.name_of(2), view.name_of(9)];

        // then (期待する結果):
        assert_eq!(names, ["alice", "bob", "user#9"]);
    }

    #[test]
    fn test_should_exit_immediately_when_unauthorized() {
        // テスト項目: トークンが拒否された場合、即座に終了すべきと判定される
        // given (前提条件):
        let error = ClientError::Unauthorized;

        // when (操作):
        let result = should_exit_immediately(&error);

        // then (期待する結果):
        assert!(result);
    }

    #[test]
    fn test_should_exit_immediately_with_connection_error() {
        // テスト項目: ConnectionError の場合、即座に終了すべきではないと判定される
        // given (前提条件):
        let error = ClientError::ConnectionError("network error".to_string());

        // when (操作):
        let result = should_exit_immediately(&error);

        // then (期待する結果):
        assert!(!result);
    }

    #[test]
    fn test_should_attempt_reconnect_when_unauthorized() {
        // テスト項目: トークンが拒否された場合、再接続すべきではないと判定される
        // given (前提条件):
        let error = ClientError::Unauthorized;

        // when (操作):
        let result = should_attempt_reconnect(&error, 0, 5);

        // then (期待する結果):
        assert!(!result);
    }

    #[test]
    fn test_should_attempt_reconnect_within_limit() {
        // テスト項目: 再接続回数が上限未満の場合、再接続すべきと判定される
        // given (前提条件):
        let error = ClientError::ConnectionError("network error".to_string());

        // when (操作):
        let result = should_attempt_reconnect(&error, 4, 5);

        // then (期待する結果):
        assert!(result);
    }

    #[test]
    fn test_should_attempt_reconnect_at_limit() {
        // テスト項目: 再接続回数が上限に達した場合、再接続すべきではないと判定される
        // given (前提条件):
        let error = ClientError::ConnectionError("network error".to_string());

        // when (操作):
        let result = should_attempt_reconnect(&error, 5, 5);

        // then (期待する結果):
        assert!(!result);
    }

    #[test]
    fn test_websocket_url_from_http_base() {
        // テスト項目: HTTP のベース URL から WebSocket の URL が組み立てられる
        // given (前提条件):
        let plain = "http://127.0.0.1:8080/";
        let tls = "https://kizuna.example.com";

        // when (操作):
        let plain_ws = websocket_url(plain, "abc").unwrap();
        let tls_ws = websocket_url(tls, "abc").unwrap();

        // then (期待する結果):
        assert_eq!(plain_ws, "ws://127.0.0.1:8080/ws?token=abc");
        assert_eq!(tls_ws, "wss://kizuna.example.com/ws?token=abc");
        assert!(websocket_url("ftp://host", "abc").is_err());
    }

    #[test]
    fn test_websocket_url_encodes_token() {
        // テスト項目: 予約文字を含むトークンもクエリ値としてエンコードされ、ベースのパスは保たれる
        // given (前提条件):
        let base = "http://127.0.0.1:8080/kizuna/";
        let token = "a&b#c+d e";

        // when (操作):
        let url = websocket_url(base, token).unwrap();

        // then (期待する結果):
        assert_eq!(
            url,
            "ws://127.0.0.1:8080/kizuna/ws?token=a%26b%23c%2Bd+e"
        );
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("token".to_string(), token.to_string())]);
    }
}
