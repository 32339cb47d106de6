/// Persistence layer
///
/// Two stores back the auth flow: the credential store for user records and
/// the refresh token store that makes refresh tokens revocable. Both are
/// traits so the service can run against Postgres or an in-memory map.

mod memory;
mod postgres;
mod sweep;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{AppError, ValidationError};

pub use memory::{InMemoryCredentialStore, InMemoryRefreshTokenStore};
pub use postgres::{PgCredentialStore, PgRefreshTokenStore};
pub use sweep::spawn_refresh_token_sweep;

/// User role. Only `user` may self-register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(ValidationError::UnsupportedValue(
                "role".to_string(),
                other.to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocialLinks {
    pub website: Option<String>,
    pub facebook: Option<String>,
    pub instagram: Option<String>,
    pub x: Option<String>,
    pub youtube: Option<String>,
}

/// Optional profile attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub social_links: SocialLinks,
}

/// A stored user, without the password hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user row together with its password hash, only returned for login
#[derive(Debug, Clone)]
pub struct UserWithSecret {
    pub user: User,
    pub password_hash: String,
}

/// Insert payload for the credential store. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub profile: Profile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithSecret>, AppError>;

    /// Fails with `DatabaseError::DuplicateKey` naming `username` or `email`.
    async fn create(&self, new_user: NewUser) -> Result<User, AppError>;

    /// Remove a user. Removing an unknown id is not an error.
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn exists(&self, token: &str) -> Result<bool, AppError>;

    /// Owner of a stored token, if the record exists.
    async fn owner(&self, token: &str) -> Result<Option<Uuid>, AppError>;

    async fn create(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, AppError>;

    /// Deleting a token that is not stored is not an error.
    async fn delete_by_token(&self, token: &str) -> Result<(), AppError>;

    /// Remove every record whose `expires_at` is before `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}

/// SHA-256 hex digest used as the lookup key for refresh tokens.
///
/// Stored keys are never the usable token itself.
pub(crate) fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
