//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::{ConversationId, UserId},
    infrastructure::dto::http::{
        ClearConversationResponse, ConnectRequest, ConnectResponse, ConnectionDto,
        ConnectionStatusResponse, ConversationSummaryDto, DisconnectResponse, HealthResponse,
        MessageDto, SendMessageRequest, UserDto,
    },
    ui::{auth::AuthenticatedUser, error::ApiError, state::AppState},
};

fn user_id(value: i64) -> Result<UserId, ApiError> {
    UserId::new(value).map_err(|e| ApiError::InvalidRequest(e.to_string()))
}

fn conversation_id(value: i64) -> Result<ConversationId, ApiError> {
    ConversationId::new(value).map_err(|e| ApiError::InvalidRequest(e.to_string()))
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Profile of the caller
pub async fn get_me(
    AuthenticatedUser(me): AuthenticatedUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<UserDto>, ApiError> {
    let user = state
        .users
        .find_user(me)
        .await
        .map_err(|e| ApiError::Storage(e.to_string()))?
        .ok_or_else(|| ApiError::UserNotFound(format!("User {} not found", me)))?;
    Ok(Json(user.into()))
}

/// Connect the caller with another user
pub async fn connect_user(
    AuthenticatedUser(me): AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConnectRequest>,
) -> Result<(StatusCode, Json<ConnectResponse>), ApiError> {
    let target = user_id(request.user_id)?;
    let (edge, conversation) = state.connect_users_usecase.execute(me, target).await?;

    // Domain Model から DTO への変換
    Ok((
        StatusCode::CREATED,
        Json(ConnectResponse {
            edge: edge.into(),
            conversation: conversation.into(),
        }),
    ))
}

/// Remove the connection between the caller and another user
pub async fn disconnect_user(
    AuthenticatedUser(me): AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Path(target): Path<i64>,
) -> Result<Json<DisconnectResponse>, ApiError> {
    let target = user_id(target)?;
    let removed = state.disconnect_users_usecase.execute(me, target).await?;
    Ok(Json(DisconnectResponse {
        ok: true,
        conversation_id: removed.conversation.id.value(),
        deleted_messages: removed.deleted_messages,
    }))
}

/// Connections of the caller with the counterpart's profile
pub async fn list_connections(
    AuthenticatedUser(me): AuthenticatedUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ConnectionDto>>, ApiError> {
    let connections = state.list_connections_usecase.execute(me).await?;
    Ok(Json(connections.into_iter().map(Into::into).collect()))
}

/// Whether the caller is connected to `user_id`
pub async fn connection_status(
    AuthenticatedUser(me): AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Path(target): Path<i64>,
) -> Result<Json<ConnectionStatusResponse>, ApiError> {
    let target_id = user_id(target)?;
    let connected = state
        .connection_status_usecase
        .execute(me, target_id)
        .await?;
    Ok(Json(ConnectionStatusResponse {
        user_id: target,
        connected,
    }))
}

/// Chat list of the caller, newest activity first
pub async fn list_conversations(
    AuthenticatedUser(me): AuthenticatedUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ConversationSummaryDto>>, ApiError> {
    let summaries = state.list_conversations_usecase.execute(me).await?;
    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}

/// Message history of a conversation
pub async fn get_messages(
    AuthenticatedUser(me): AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let messages = state
        .get_history_usecase
        .execute(me, conversation_id(id)?)
        .await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

/// Post a message to a conversation
pub async fn post_message(
    AuthenticatedUser(me): AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let message = state
        .send_message_usecase
        .execute(me, conversation_id(id)?, request.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message.into())))
}

/// Delete every message of a conversation
pub async fn clear_messages(
    AuthenticatedUser(me): AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ClearConversationResponse>, ApiError> {
    let deleted = state
        .clear_conversation_usecase
        .execute(me, conversation_id(id)?)
        .await?;
    Ok(Json(ClearConversationResponse {
        conversation_id: id,
        deleted_messages: deleted,
    }))
}
