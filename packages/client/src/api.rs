//! REST client for the Kizuna API.
//!
//! REST fetches are the source of truth for initial load and after a reconnect; the
//! WebSocket session only carries incremental updates.

use kizuna_server::infrastructure::dto::http::{
    ClearConversationResponse, ConnectRequest, ConnectResponse, ConnectionDto,
    ConnectionStatusResponse, ConversationSummaryDto, DisconnectResponse, ErrorResponse,
    MessageDto, SendMessageRequest, UserDto,
};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::{domain::websocket_url, error::ClientError};

/// Authenticated HTTP client
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// WebSocket endpoint for this server and token
    pub fn ws_url(&self) -> Result<String, ClientError> {
        websocket_url(&self.base_url, &self.token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }

        match response.json::<ErrorResponse>().await {
            Ok(body) => Err(ClientError::Api {
                status,
                kind: body.error.kind,
                message: body.error.message,
            }),
            Err(_) => Err(ClientError::Api {
                status,
                kind: "Unknown".to_string(),
                message: status.to_string(),
            }),
        }
    }

    pub async fn me(&self) -> Result<UserDto, ClientError> {
        self.send(self.http.get(self.url("/api/me"))).await
    }

    pub async fn connect(&self, user_id: i64) -> Result<ConnectResponse, ClientError> {
        let request = self
            .http
            .post(self.url("/api/connections"))
            .json(&ConnectRequest { user_id });
        self.send(request).await
    }

    pub async fn disconnect(&self, user_id: i64) -> Result<DisconnectResponse, ClientError> {
        let path = format!("/api/connections/{}", user_id);
        self.send(self.http.delete(self.url(&path))).await
    }

    pub async fn connections(&self) -> Result<Vec<ConnectionDto>, ClientError> {
        self.send(self.http.get(self.url("/api/connections"))).await
    }

    pub async fn connection_status(
        &self,
        user_id: i64,
    ) -> Result<ConnectionStatusResponse, ClientError> {
        let path = format!("/api/connections/status/{}", user_id);
        self.send(self.http.get(self.url(&path))).await
    }

    pub async fn conversations(&self) -> Result<Vec<ConversationSummaryDto>, ClientError> {
        self.send(self.http.get(self.url("/api/conversations"))).await
    }

    pub async fn history(&self, conversation_id: i64) -> Result<Vec<MessageDto>, ClientError> {
        let path = format!("/api/conversations/{}/messages", conversation_id);
        self.send(self.http.get(self.url(&path))).await
    }

    pub async fn send_message(
        &self,
        conversation_id: i64,
        content: String,
    ) -> Result<MessageDto, ClientError> {
        let path = format!("/api/conversations/{}/messages", conversation_id);
        let request = self
            .http
            .post(self.url(&path))
            .json(&SendMessageRequest { content });
        self.send(request).await
    }

    pub async fn clear(
        &self,
        conversation_id: i64,
    ) -> Result<ClearConversationResponse, ClientError> {
        let path = format!("/api/conversations/{}/messages", conversation_id);
        self.send(self.http.delete(self.url(&path))).await
    }
}
