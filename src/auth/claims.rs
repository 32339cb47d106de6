/// JWT Claims structure
///
/// Payload shared by access and refresh tokens. The `sub` claim carries the
/// token class so one kind can never stand in for the other.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub const ACCESS_SUBJECT: &str = "accessApi";
pub const REFRESH_SUBJECT: &str = "refreshToken";

/// Which class of token is being minted or verified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn subject(&self) -> &'static str {
        match self {
            TokenKind::Access => ACCESS_SUBJECT,
            TokenKind::Refresh => REFRESH_SUBJECT,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Owning user (UUID string)
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Token class discriminator
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Unique token id; two tokens minted in the same second still differ
    pub jti: String,
}

impl Claims {
    pub fn new(user_id: Uuid, kind: TokenKind, ttl_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            user_id: user_id.to_string(),
            sub: kind.subject().to_string(),
            iat: now,
            exp: now + ttl_seconds,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// Returns error if the embedded id is not a valid UUID
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.user_id)
            .map_err(|_| AppError::Internal("Invalid user ID in token".to_string()))
    }
}
