//! HTTP API request / response bodies.

use serde::{Deserialize, Serialize};

pub use super::websocket::{ConnectionEdgeDto, ConversationDto, MessageDto, UserDto};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// `POST /api/connections`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub edge: ConnectionEdgeDto,
    pub conversation: ConversationDto,
}

/// `DELETE /api/connections/{user_id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectResponse {
    pub ok: bool,
    pub conversation_id: i64,
    pub deleted_messages: u64,
}

/// One row of `GET /api/connections`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDto {
    pub edge: ConnectionEdgeDto,
    pub user: UserDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatusResponse {
    pub user_id: i64,
    pub connected: bool,
}

/// One row of `GET /api/conversations`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummaryDto {
    pub conversation: ConversationDto,
    pub counterpart: UserDto,
    #[serde(default)]
    pub last_message: Option<MessageDto>,
}

/// `POST /api/conversations/{id}/messages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// `DELETE /api/conversations/{id}/messages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearConversationResponse {
    pub conversation_id: i64,
    pub deleted_messages: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
}

/// `{"error": {"kind": "...", "message": "..."}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}
