//! WebSocket session handlers.
//!
//! Each socket becomes one hub session owned by the authenticated caller. The hub keeps the
//! only sender for the session, so every outbound frame (events and command replies alike)
//! goes through [`SessionRegistry::push_to`]. Dropping the session from the hub therefore
//! closes the socket.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use kizuna_shared::time::Clock;
use tokio::sync::mpsc;

use crate::{
    domain::{Channel, ConversationId, SessionId, SessionRegistry, Timestamp, UserId},
    infrastructure::dto::websocket::{ClientCommand, ServerEvent},
    ui::{auth::AuthenticatedUser, error::ApiError, state::AppState},
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("User {} is opening a real-time session", user_id);
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

/// Spawns a task that forwards frames queued by the hub to the WebSocket sink.
///
/// The loop ends when the hub drops the session's sender (unregistered or reaped); a Close
/// frame is sent so the client sees an orderly shutdown.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: SplitSink<WebSocket, WsMessage>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(WsMessage::Text(frame.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(WsMessage::Close(None)).await;
    })
}

async fn push_event(registry: &dyn SessionRegistry, session_id: SessionId, event: &ServerEvent) {
    let frame = match serde_json::to_string(event) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!("Failed to serialize reply for session {}: {}", session_id, e);
            return;
        }
    };
    if let Err(e) = registry.push_to(session_id, frame).await {
        tracing::debug!("Reply to session {} dropped: {}", session_id, e);
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: UserId) {
    let (sender, mut receiver) = socket.split();

    let (tx, rx) = mpsc::unbounded_channel();
    let now = Timestamp::new(state.clock.now_millis());
    let session_id = state.registry.register_session(user_id, tx, now).await;
    tracing::info!("Session {} registered for user {}", session_id, user_id);

    let mut send_task = pusher_loop(rx, sender);

    let ready = ServerEvent::SessionReady {
        session_id: session_id.to_string(),
        user_id: user_id.value(),
        channels: vec![Channel::User(user_id).to_string()],
    };
    push_event(state.registry.as_ref(), session_id, &ready).await;

    let state_clone = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let now = Timestamp::new(state_clone.clock.now_millis());
            if state_clone.registry.touch(session_id, now).await.is_err() {
                tracing::info!("Session {} is gone, closing", session_id);
                break;
            }

            match msg {
                WsMessage::Text(text) => {
                    if let Some(reply) = handle_command(&state_clone, session_id, &text).await {
                        push_event(state_clone.registry.as_ref(), session_id, &reply).await;
                    }
                }
                WsMessage::Ping(_) => {
                    // Pong is answered by the WebSocket protocol; the touch above is enough
                    tracing::debug!("Received ping from session {}", session_id);
                }
                WsMessage::Close(_) => {
                    tracing::info!("Session {} requested close", session_id);
                    break;
                }
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    if state.registry.unregister_session(session_id).await {
        tracing::info!("Session {} of user {} closed", session_id, user_id);
    }
}

/// Parse one client frame and run it; the returned event is the reply for this session only.
async fn handle_command(state: &AppState, session_id: SessionId, text: &str) -> Option<ServerEvent> {
    let command: ClientCommand = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(e) => {
            tracing::warn!("Invalid frame from session {}: {}", session_id, e);
            return Some(ApiError::InvalidRequest(format!("Invalid command: {}", e)).to_event());
        }
    };

    match run_command(state, session_id, command).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!("Command from session {} failed: {}", session_id, e);
            Some(e.to_event())
        }
    }
}

async fn run_command(
    state: &AppState,
    session_id: SessionId,
    command: ClientCommand,
) -> Result<Option<ServerEvent>, ApiError> {
    let subscriptions = &state.subscription_usecase;
    match command {
        ClientCommand::SubscribeConversation { conversation_id } => {
            let id = conversation_id_from(conversation_id)?;
            subscriptions.subscribe_conversation(session_id, id).await?;
            Ok(Some(ServerEvent::Subscribed {
                channel: Channel::Conversation(id).to_string(),
            }))
        }
        ClientCommand::UnsubscribeConversation { conversation_id } => {
            let id = conversation_id_from(conversation_id)?;
            subscriptions.unsubscribe_conversation(session_id, id).await?;
            Ok(Some(ServerEvent::Unsubscribed {
                channel: Channel::Conversation(id).to_string(),
            }))
        }
        ClientCommand::SubscribeUser { user_id } => {
            let id = user_id_from(user_id)?;
            subscriptions.subscribe_user(session_id, id).await?;
            Ok(Some(ServerEvent::Subscribed {
                channel: Channel::User(id).to_string(),
            }))
        }
        ClientCommand::UnsubscribeUser { user_id } => {
            let id = user_id_from(user_id)?;
            subscriptions.unsubscribe_user(session_id, id).await?;
            Ok(Some(ServerEvent::Unsubscribed {
                channel: Channel::User(id).to_string(),
            }))
        }
        ClientCommand::SendMessage {
            conversation_id,
            content,
        } => {
            let id = conversation_id_from(conversation_id)?;
            let sender = state
                .registry
                .session_user(session_id)
                .await
                .ok_or(ApiError::SessionExpired)?;
            let message = state
                .send_message_usecase
                .execute(sender, id, content)
                .await?;
            // Subscribers (this session included, if it has the conversation open) get
            // message-posted through the hub; nothing else to reply.
            tracing::debug!("Message {} posted over session {}", message.id, session_id);
            Ok(None)
        }
        ClientCommand::Ping => Ok(Some(ServerEvent::Pong {
            timestamp: state.clock.now_millis(),
        })),
    }
}

fn user_id_from(value: i64) -> Result<UserId, ApiError> {
    UserId::new(value).map_err(|e| ApiError::InvalidRequest(e.to_string()))
}

fn conversation_id_from(value: i64) -> Result<ConversationId, ApiError> {
    ConversationId::new(value).map_err(|e| ApiError::InvalidRequest(e.to_string()))
}
