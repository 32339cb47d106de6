use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    hash_token, CredentialStore, NewUser, Profile, RefreshToken, RefreshTokenStore, SocialLinks,
    User, UserWithSecret,
};
use crate::error::{AppError, DatabaseError};

/// Postgres-backed credential store.
///
/// Uniqueness of `username` and `email` is enforced by the
/// `users_username_key` and `users_email_key` constraints.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    first_name: Option<String>,
    last_name: Option<String>,
    website: Option<String>,
    facebook: Option<String>,
    instagram: Option<String>,
    x: Option<String>,
    youtube: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user_with_secret(self) -> Result<UserWithSecret, AppError> {
        let role = self.role.parse().map_err(|_| {
            AppError::Database(DatabaseError::UnexpectedError(format!(
                "user {} has unknown role '{}'",
                self.id, self.role
            )))
        })?;

        Ok(UserWithSecret {
            user: User {
                id: self.id,
                username: self.username,
                email: self.email,
                role,
                profile: Profile {
                    first_name: self.first_name,
                    last_name: self.last_name,
                    social_links: SocialLinks {
                        website: self.website,
                        facebook: self.facebook,
                        instagram: self.instagram,
                        x: self.x,
                        youtube: self.youtube,
                    },
                },
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            password_hash: self.password_hash,
        })
    }
}

const SELECT_USER: &str = r#"
    SELECT id, username, email, password_hash, role, first_name, last_name,
           website, facebook, instagram, x, youtube, created_at, updated_at
    FROM users
"#;

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithSecret>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{} WHERE email = $1", SELECT_USER))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_user_with_secret).transpose()
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let links = &new_user.profile.social_links;

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, first_name, last_name,
                               website, facebook, instagram, x, youtube, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(id)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.role.as_str())
        .bind(&new_user.profile.first_name)
        .bind(&new_user.profile.last_name)
        .bind(&links.website)
        .bind(&links.facebook)
        .bind(&links.instagram)
        .bind(&links.x)
        .bind(&links.youtube)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id,
            username: new_user.username,
            email: new_user.email,
            role: new_user.role,
            profile: new_user.profile,
            created_at: now,
            updated_at: now,
        })
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Postgres-backed refresh token store keyed by the SHA-256 of the token.
#[derive(Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn exists(&self, token: &str) -> Result<bool, AppError> {
        Ok(self.owner(token).await?.is_some())
    }

    async fn owner(&self, token: &str) -> Result<Option<Uuid>, AppError> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM refresh_tokens WHERE token_hash = $1",
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(user_id)
    }

    async fn create(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, AppError> {
        let record = RefreshToken {
            id: Uuid::new_v4(),
            user_id,
            created_at: Utc::now(),
            expires_at,
        };

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(hash_token(token))
        .bind(record.expires_at)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn delete_by_token(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(hash_token(token))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
