//! Repository 実装
//!
//! - `inmemory`: 単一の Mutex で全テーブルを保護するインメモリ実装
//! - `sqlite`: sqlx による SQLite 実装

pub mod inmemory;
pub mod sqlite;

pub use inmemory::InMemoryStore;
pub use sqlite::SqliteStore;
