//! Kizuna server: connection graph, conversations and the real-time hub.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kizuna-server -- --users-file users.json
//! cargo run --bin kizuna-server -- --database-url sqlite://kizuna.db --users-file users.json
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use kizuna_server::{
    config::ServerConfig,
    domain::{ConversationRepository, GraphRepository, MAX_CONTENT_LEN, UserRepository},
    infrastructure::{
        realtime::{RealtimeHub, spawn_reaper},
        repository::{InMemoryStore, SqliteStore},
        seed::{UserSeed, load_user_seeds},
    },
    ui::{AppState, Server},
};
use kizuna_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

#[derive(Parser, Debug)]
#[command(name = "kizuna-server")]
#[command(about = "Connection graph, messaging and real-time hub for Kizuna", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// SQLite connection string (e.g. sqlite://kizuna.db); in-memory when omitted
    #[arg(long)]
    database_url: Option<String>,

    /// JSON file with the users to seed
    #[arg(short = 'u', long)]
    users_file: Option<PathBuf>,

    /// Drop real-time sessions silent for longer than this many seconds
    #[arg(long, default_value = "60")]
    session_timeout_secs: u64,

    /// How often to look for idle sessions, in seconds
    #[arg(long, default_value = "15")]
    reap_interval_secs: u64,

    /// Maximum message length in characters
    #[arg(long, default_value_t = MAX_CONTENT_LEN)]
    max_content_len: usize,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            database_url: args.database_url,
            users_file: args.users_file,
            session_timeout: Duration::from_secs(args.session_timeout_secs),
            reap_interval: Duration::from_secs(args.reap_interval_secs.max(1)),
            max_content_len: args.max_content_len,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let config = ServerConfig::from(Args::parse());

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize dependencies in order:
    // 1. Identity records
    // 2. Store (in-memory or SQLite)
    // 3. Hub, UseCases and AppState
    // 4. Reaper and Server
    let seeds = match &config.users_file {
        Some(path) => load_user_seeds(path).await?,
        None => {
            tracing::warn!("No users file given; every request will be rejected as Unauthorized");
            Vec::new()
        }
    };

    match &config.database_url {
        Some(url) => {
            let store = SqliteStore::connect(url, 5).await?;
            for seed in &seeds {
                store.upsert_user(seed).await?;
            }
            log_seeded(&seeds);
            serve(Arc::new(store), config).await
        }
        None => {
            let store = InMemoryStore::new();
            for seed in &seeds {
                store.upsert_user(seed).await;
            }
            log_seeded(&seeds);
            serve(Arc::new(store), config).await
        }
    }
}

fn log_seeded(seeds: &[UserSeed]) {
    tracing::info!("{} users loaded", seeds.len());
}

async fn serve<S>(store: Arc<S>, config: ServerConfig) -> Result<(), Box<dyn std::error::Error>>
where
    S: UserRepository + GraphRepository + ConversationRepository + 'static,
{
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let hub = Arc::new(RealtimeHub::new());
    let state = AppState::new(store, hub.clone(), clock.clone(), config.max_content_len);

    let reaper = spawn_reaper(hub, clock, config.session_timeout, config.reap_interval);

    let result = Server::new(state).run(config.host, config.port).await;
    reaper.abort();
    result
}
