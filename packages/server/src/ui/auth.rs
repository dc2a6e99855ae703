//! Caller identity.
//!
//! Every entry point requires a pre-authenticated caller. The credential is the user's
//! session token, sent as `Authorization: Bearer <token>`. Browsers cannot set headers on
//! a WebSocket upgrade, so `?token=<token>` is accepted as well.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Query},
    http::{header, request::Parts},
};
use serde::Deserialize;

use crate::domain::UserId;

use super::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Extract the raw credential from the request, header first.
pub fn token_from_parts(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());
    if from_header.is_some() {
        return from_header;
    }

    Query::<TokenQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(query)| query.token)
}

/// The authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        let user_id = state
            .users
            .find_user_id_by_token(&token)
            .await
            .map_err(|e| ApiError::Storage(e.to_string()))?
            .ok_or(ApiError::Unauthorized)?;

        Ok(AuthenticatedUser(user_id))
    }
}
