//! In-process test server shared by the integration tests.

#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use futures_util::StreamExt;
use kizuna_server::{
    domain::{ConversationRepository, GraphRepository, MAX_CONTENT_LEN, UserId, UserRepository},
    infrastructure::{
        realtime::RealtimeHub,
        repository::{InMemoryStore, SqliteStore},
        seed::UserSeed,
    },
    ui::{AppState, Server},
};
use kizuna_shared::time::FixedClock;
use serde_json::Value;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub const ALICE: &str = "token-alice";
pub const BOB: &str = "token-bob";
pub const CHARLIE: &str = "token-charlie";

fn seeds() -> Vec<UserSeed> {
    [(1, "alice"), (2, "bob"), (3, "charlie")]
        .into_iter()
        .map(|(id, name)| UserSeed {
            id: UserId::new(id).unwrap(),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            bio: None,
            token: format!("token-{name}"),
        })
        .collect()
}

/// Server bound to an ephemeral port, stopped on drop
pub struct TestServer {
    pub addr: std::net::SocketAddr,
    pub hub: Arc<RealtimeHub>,
    pub clock: Arc<FixedClock>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start a server with alice(1), bob(2) and charlie(3) on the in-memory store
    pub async fn start() -> Self {
        let store = InMemoryStore::new();
        for seed in seeds() {
            store.upsert_user(&seed).await;
        }
        Self::start_on(Arc::new(store)).await
    }

    /// Same users, persisted in an in-memory SQLite database
    pub async fn start_sqlite() -> Self {
        let store = SqliteStore::in_memory().await.unwrap();
        for seed in seeds() {
            store.upsert_user(&seed).await.unwrap();
        }
        Self::start_on(Arc::new(store)).await
    }

    async fn start_on<S>(store: Arc<S>) -> Self
    where
        S: UserRepository + GraphRepository + ConversationRepository + 'static,
    {
        let hub = Arc::new(RealtimeHub::new());
        let clock = Arc::new(FixedClock::new(1_700_000_000_000));
        let state = AppState::new(store, hub.clone(), clock.clone(), MAX_CONTENT_LEN);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            Server::new(state)
                .serve(listener, async move {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            hub,
            clock,
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, token: &str) -> String {
        format!("ws://{}/ws?token={}", self.addr, token)
    }

    /// Open a real-time session and consume its `session-ready` frame
    pub async fn open_session(&self, token: &str) -> (WsStream, Value) {
        let (mut ws, _) = connect_async(self.ws_url(token)).await.unwrap();
        let ready = next_event(&mut ws).await;
        assert_eq!(ready["type"], "session-ready");
        (ws, ready)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Next JSON frame from the server, failing after two seconds
pub async fn next_event(ws: &mut WsStream) -> Value {
    let deadline = Duration::from_secs(2);
    loop {
        let frame = tokio::time::timeout(deadline, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .expect("socket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Assert that nothing arrives for a short while
pub async fn assert_silent(ws: &mut WsStream) {
    let result = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(result.is_err(), "unexpected frame: {:?}", result);
}

/// Send a client command frame
pub async fn send_command(ws: &mut WsStream, command: Value) {
    use futures_util::SinkExt;
    ws.send(Message::Text(command.to_string().into()))
        .await
        .unwrap();
}

/// Whether the server closed the socket within two seconds
pub async fn is_closed(ws: &mut WsStream) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        match tokio::time::timeout_at(deadline, ws.next()).await {
            Err(_) => return false,
            Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return true,
            Ok(Some(Ok(_))) => continue,
        }
    }
}

pub fn http() -> reqwest::Client {
    reqwest::Client::new()
}

/// Connect the owner of `token` with `user_id` and return the response body
pub async fn connect(server: &TestServer, token: &str, user_id: i64) -> Value {
    let response = http()
        .post(server.url("/api/connections"))
        .bearer_auth(token)
        .json(&serde_json::json!({ "user_id": user_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    response.json().await.unwrap()
}
