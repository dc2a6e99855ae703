//! Use case errors mapped to HTTP responses and WebSocket error frames.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    domain::SessionError,
    infrastructure::dto::{
        http::{ErrorDetail, ErrorResponse},
        websocket::ServerEvent,
    },
    usecase::{
        ClearConversationError, ConnectError, DisconnectError, HistoryError, ListError,
        SendMessageError, SubscribeError,
    },
};

/// Error returned by every HTTP handler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidTarget(String),

    #[error("Message content must not be empty")]
    EmptyContent,

    #[error("Message content is too long ({actual} > {max} characters)")]
    ContentTooLong { max: usize, actual: usize },

    /// Malformed ids or frames
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Missing or invalid session token")]
    Unauthorized,

    /// The real-time session was closed or timed out
    #[error("Session expired")]
    SessionExpired,

    #[error("{0}")]
    NotAParticipant(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    UserNotFound(String),

    #[error("Users are not connected")]
    NotConnected,

    #[error("{0}")]
    ConversationNotFound(String),

    #[error("Users are already connected")]
    AlreadyConnected,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ApiError {
    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidTarget(_) => "InvalidTarget",
            ApiError::EmptyContent => "EmptyContent",
            ApiError::ContentTooLong { .. } => "ContentTooLong",
            ApiError::InvalidRequest(_) => "InvalidRequest",
            ApiError::Unauthorized => "Unauthorized",
            ApiError::SessionExpired => "SessionExpired",
            ApiError::NotAParticipant(_) => "NotAParticipant",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::UserNotFound(_) => "UserNotFound",
            ApiError::NotConnected => "NotConnected",
            ApiError::ConversationNotFound(_) => "ConversationNotFound",
            ApiError::AlreadyConnected => "AlreadyConnected",
            ApiError::Storage(_) => "StorageError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidTarget(_)
            | ApiError::EmptyContent
            | ApiError::ContentTooLong { .. }
            | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::SessionExpired => StatusCode::UNAUTHORIZED,
            ApiError::NotAParticipant(_) | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::UserNotFound(_)
            | ApiError::NotConnected
            | ApiError::ConversationNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyConnected => StatusCode::CONFLICT,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The same error as a WebSocket frame
    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::Error {
            kind: self.kind().to_string(),
            message: self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected ({}): {}", self.kind(), self);
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                kind: self.kind().to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ConnectError> for ApiError {
    fn from(e: ConnectError) -> Self {
        match e {
            ConnectError::InvalidTarget => Self::InvalidTarget(e.to_string()),
            ConnectError::AlreadyConnected => Self::AlreadyConnected,
            ConnectError::UserNotFound(_) => Self::UserNotFound(e.to_string()),
            ConnectError::Storage(msg) => Self::Storage(msg),
        }
    }
}

impl From<DisconnectError> for ApiError {
    fn from(e: DisconnectError) -> Self {
        match e {
            DisconnectError::InvalidTarget => Self::InvalidTarget(e.to_string()),
            DisconnectError::NotConnected => Self::NotConnected,
            DisconnectError::Storage(msg) => Self::Storage(msg),
        }
    }
}

impl From<ListError> for ApiError {
    fn from(e: ListError) -> Self {
        match e {
            ListError::Storage(msg) => Self::Storage(msg),
        }
    }
}

impl From<SendMessageError> for ApiError {
    fn from(e: SendMessageError) -> Self {
        match e {
            SendMessageError::EmptyContent => Self::EmptyContent,
            SendMessageError::ContentTooLong { max, actual } => Self::ContentTooLong { max, actual },
            SendMessageError::ConversationNotFound(_) => Self::ConversationNotFound(e.to_string()),
            SendMessageError::NotAParticipant(_) => Self::NotAParticipant(e.to_string()),
            SendMessageError::Storage(msg) => Self::Storage(msg),
        }
    }
}

impl From<HistoryError> for ApiError {
    fn from(e: HistoryError) -> Self {
        match e {
            HistoryError::ConversationNotFound(_) => Self::ConversationNotFound(e.to_string()),
            HistoryError::NotAParticipant(_) => Self::NotAParticipant(e.to_string()),
            HistoryError::Storage(msg) => Self::Storage(msg),
        }
    }
}

impl From<ClearConversationError> for ApiError {
    fn from(e: ClearConversationError) -> Self {
        match e {
            ClearConversationError::ConversationNotFound(_) => {
                Self::ConversationNotFound(e.to_string())
            }
            ClearConversationError::NotAParticipant(_) => Self::NotAParticipant(e.to_string()),
            ClearConversationError::Storage(msg) => Self::Storage(msg),
        }
    }
}

impl From<SubscribeError> for ApiError {
    fn from(e: SubscribeError) -> Self {
        match e {
            SubscribeError::ConversationNotFound(_) => Self::ConversationNotFound(e.to_string()),
            SubscribeError::NotAParticipant(_) => Self::NotAParticipant(e.to_string()),
            SubscribeError::ForeignUserChannel(_) => Self::Forbidden(e.to_string()),
            SubscribeError::Session(SessionError::UnknownSession(_) | SessionError::Closed(_)) => {
                Self::SessionExpired
            }
            SubscribeError::Storage(msg) => Self::Storage(msg),
        }
    }
}
