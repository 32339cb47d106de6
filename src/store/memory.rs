use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    hash_token, CredentialStore, NewUser, RefreshToken, RefreshTokenStore, User, UserWithSecret,
};
use crate::error::{AppError, DatabaseError};

fn poisoned() -> AppError {
    AppError::Internal("in-memory store lock poisoned".to_string())
}

/// Credential store held in process memory.
///
/// Uniqueness checks and the insert happen under one lock, so concurrent
/// duplicate registrations resolve the same way the database constraints do.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: Mutex<HashMap<Uuid, UserWithSecret>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.lock().map(|users| users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithSecret>, AppError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        Ok(users.values().find(|u| u.user.email == email).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.lock().map_err(|_| poisoned())?;

        if users.values().any(|u| u.user.username == new_user.username) {
            return Err(DatabaseError::DuplicateKey("username".to_string()).into());
        }
        if users.values().any(|u| u.user.email == new_user.email) {
            return Err(DatabaseError::DuplicateKey("email".to_string()).into());
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            role: new_user.role,
            profile: new_user.profile,
            created_at: now,
            updated_at: now,
        };

        users.insert(
            user.id,
            UserWithSecret {
                user: user.clone(),
                password_hash: new_user.password_hash,
            },
        );

        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut users = self.users.lock().map_err(|_| poisoned())?;
        users.remove(&id);
        Ok(())
    }
}

/// Refresh token store held in process memory, keyed by token digest.
#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    tokens: Mutex<HashMap<String, RefreshToken>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records owned by `user_id`.
    pub fn count_for_user(&self, user_id: Uuid) -> usize {
        self.tokens
            .lock()
            .map(|tokens| tokens.values().filter(|t| t.user_id == user_id).count())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().map(|tokens| tokens.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn exists(&self, token: &str) -> Result<bool, AppError> {
        let tokens = self.tokens.lock().map_err(|_| poisoned())?;
        Ok(tokens.contains_key(&hash_token(token)))
    }

    async fn owner(&self, token: &str) -> Result<Option<Uuid>, AppError> {
        let tokens = self.tokens.lock().map_err(|_| poisoned())?;
        Ok(tokens.get(&hash_token(token)).map(|t| t.user_id))
    }

    async fn create(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, AppError> {
        let mut tokens = self.tokens.lock().map_err(|_| poisoned())?;
        let key = hash_token(token);

        if tokens.contains_key(&key) {
            return Err(DatabaseError::DuplicateKey("token".to_string()).into());
        }

        let record = RefreshToken {
            id: Uuid::new_v4(),
            user_id,
            created_at: Utc::now(),
            expires_at,
        };
        tokens.insert(key, record.clone());

        Ok(record)
    }

    async fn delete_by_token(&self, token: &str) -> Result<(), AppError> {
        let mut tokens = self.tokens.lock().map_err(|_| poisoned())?;
        tokens.remove(&hash_token(token));
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut tokens = self.tokens.lock().map_err(|_| poisoned())?;
        let before = tokens.len();
        tokens.retain(|_, t| t.expires_at >= now);
        Ok((before - tokens.len()) as u64)
    }
}
