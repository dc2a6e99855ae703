//! Identity records loaded at startup.
//!
//! Registration lives outside this service; the server is seeded with the users it
//! should know about from a JSON file:
//!
//! ```json
//! [{ "id": 1, "username": "alice", "email": "alice@example.com", "token": "alice-token" }]
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{User, UserId};

/// One identity record with its bearer credential
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserSeed {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
    /// Session token presented as `Authorization: Bearer <token>`
    pub token: String,
}

impl UserSeed {
    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            bio: self.bio.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read users file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse users file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate {field} '{value}' in users file")]
    Duplicate { field: &'static str, value: String },
}

/// Parse and validate a users seed document
pub fn parse_user_seeds(json: &str) -> Result<Vec<UserSeed>, SeedError> {
    let seeds: Vec<UserSeed> = serde_json::from_str(json)?;

    let mut ids = std::collections::HashSet::new();
    let mut tokens = std::collections::HashSet::new();
    for seed in &seeds {
        if !ids.insert(seed.id) {
            return Err(SeedError::Duplicate {
                field: "id",
                value: seed.id.to_string(),
            });
        }
        if !tokens.insert(seed.token.as_str()) {
            return Err(SeedError::Duplicate {
                field: "token",
                value: seed.token.clone(),
            });
        }
    }

    Ok(seeds)
}

/// Load users from a JSON file
pub async fn load_user_seeds(path: &Path) -> Result<Vec<UserSeed>, SeedError> {
    let json = tokio::fs::read_to_string(path).await?;
    parse_user_seeds(&json)
}
