//! Server configuration

use std::{path::PathBuf, time::Duration};

use crate::domain::MAX_CONTENT_LEN;

/// Configuration for the Kizuna server
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// SQLite connection string (e.g. `sqlite://kizuna.db`); `None` keeps everything in memory
    pub database_url: Option<String>,
    /// JSON file with the identity records to seed
    pub users_file: Option<PathBuf>,
    /// Sessions silent for longer than this are dropped
    pub session_timeout: Duration,
    /// How often idle sessions are looked for
    pub reap_interval: Duration,
    /// Maximum message length in characters
    pub max_content_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: None,
            users_file: None,
            session_timeout: Duration::from_secs(60),
            reap_interval: Duration::from_secs(15),
            max_content_len: MAX_CONTENT_LEN,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // テスト項目: デフォルト設定はローカルのインメモリ構成
        // given (前提条件):
        let config = ServerConfig::default();

        // when (操作):
        let addr = config.bind_addr();

        // then (期待する結果):
        assert_eq!(addr, "127.0.0.1:8080");
        assert_eq!(config.database_url, None);
        assert_eq!(config.session_timeout, Duration::from_secs(60));
        assert_eq!(config.max_content_len, 4000);
    }
}
