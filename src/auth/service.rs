/// Auth Service
///
/// Orchestrates registration, login, access-token refresh and logout over
/// the credential store, the refresh token store and the token service.

use std::sync::Arc;

use lazy_static::lazy_static;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use uuid::Uuid;

use crate::auth::jwt::{TokenError, TokenService};
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AuthError, DatabaseError, ValidationError};
use crate::store::{
    CredentialStore, NewUser, Profile, RefreshTokenStore, Role, SocialLinks, User,
};
use crate::validators::{
    is_valid_email, is_valid_password, is_valid_username, optional_field, MAX_LINK_LENGTH,
    MAX_NAME_LENGTH,
};

/// Inserts attempted before giving up on a unique generated username
pub const USERNAME_ATTEMPTS: usize = 5;

/// Random characters after the `user` prefix of a generated username
pub const USERNAME_SUFFIX_LENGTH: usize = 12;

pub type UsernameGenerator = Arc<dyn Fn() -> String + Send + Sync>;

lazy_static! {
    /// Checked against when the email is unknown, so every failed login
    /// runs one bcrypt verify at the stored cost.
    static ref UNKNOWN_USER_HASH: Option<String> = hash_password("unknown-user").ok();
}

/// `user` followed by twelve random lowercase alphanumerics
pub fn generate_username() -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(USERNAME_SUFFIX_LENGTH)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("user{}", suffix)
}

/// Registration input after the HTTP body has been parsed
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub social_links: Option<SocialLinks>,
}

/// Outcome of a successful register or login
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    tokens: TokenService,
    username_generator: UsernameGenerator,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        tokens: TokenService,
    ) -> Self {
        Self {
            credentials,
            refresh_tokens,
            tokens,
            username_generator: Arc::new(generate_username),
        }
    }

    pub fn with_username_generator(mut self, generator: UsernameGenerator) -> Self {
        self.username_generator = generator;
        self
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn refresh_token_store(&self) -> Arc<dyn RefreshTokenStore> {
        self.refresh_tokens.clone()
    }

    /// Create a `user`-role account and open a session for it.
    ///
    /// # Errors
    /// - `AuthError::Forbidden` when `role` is admin; nothing is written
    /// - `ValidationError` for malformed fields
    /// - `DatabaseError::DuplicateKey("email")` when the email is taken
    pub async fn register(&self, input: RegisterInput) -> Result<Session, AppError> {
        if input.role == Role::Admin {
            return Err(AuthError::Forbidden(
                "Admin accounts cannot be self-registered".to_string(),
            )
            .into());
        }

        let email = is_valid_email(&input.email)?;
        is_valid_password(&input.password)?;
        let profile = validate_profile(&input)?;

        let password_hash = hash_password(&input.password)?;
        let user = self
            .create_with_unique_username(email, password_hash, input.role, profile)
            .await?;

        let user_id = user.id;
        let session = match self.open_session(user).await {
            Ok(session) => session,
            Err(e) => {
                self.discard_unsessioned_user(user_id).await;
                return Err(e);
            }
        };
        tracing::info!(
            user_id = %session.user.id,
            username = %session.user.username,
            "User registered successfully"
        );
        Ok(session)
    }

    /// Remove a user whose first session could not be stored, so the email
    /// can be registered again.
    async fn discard_unsessioned_user(&self, user_id: Uuid) {
        match self.credentials.delete(user_id).await {
            Ok(()) => {
                tracing::warn!(user_id = %user_id, "Registration rolled back, session not stored")
            }
            Err(e) => tracing::error!(
                user_id = %user_id,
                error = %e,
                "Registration left a user without a session"
            ),
        }
    }

    async fn create_with_unique_username(
        &self,
        email: String,
        password_hash: String,
        role: Role,
        profile: Profile,
    ) -> Result<User, AppError> {
        for attempt in 1..=USERNAME_ATTEMPTS {
            let username = (self.username_generator)();
            is_valid_username(&username)?;

            let new_user = NewUser {
                username,
                email: email.clone(),
                password_hash: password_hash.clone(),
                role,
                profile: profile.clone(),
            };

            match self.credentials.create(new_user).await {
                Ok(user) => return Ok(user),
                Err(AppError::Database(DatabaseError::DuplicateKey(field)))
                    if field == "username" =>
                {
                    tracing::warn!(attempt = attempt, "Generated username collided, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Internal(format!(
            "could not allocate a unique username after {} attempts",
            USERNAME_ATTEMPTS
        )))
    }

    /// Authenticate by email and password.
    ///
    /// Unknown email and wrong password both fail with `AuthError::NotFound`.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ValidationError::EmptyField("email".to_string()).into());
        }
        if password.is_empty() {
            return Err(ValidationError::EmptyField("password".to_string()).into());
        }

        let Some(found) = self.credentials.find_by_email(email).await? else {
            if let Some(hash) = UNKNOWN_USER_HASH.as_ref() {
                let _ = verify_password(password, hash);
            }
            tracing::warn!("Login attempt for unknown email");
            return Err(AuthError::NotFound.into());
        };

        if !verify_password(password, &found.password_hash)? {
            tracing::warn!(user_id = %found.user.id, "Login attempt with wrong password");
            return Err(AuthError::NotFound.into());
        }

        let session = self.open_session(found.user).await?;
        tracing::info!(user_id = %session.user.id, "User logged in successfully");
        Ok(session)
    }

    async fn open_session(&self, user: User) -> Result<Session, AppError> {
        let access_token = self.tokens.issue_access_token(user.id)?;
        let refresh = self.tokens.issue_refresh_token(user.id)?;

        self.refresh_tokens
            .create(&refresh.token, user.id, refresh.expires_at)
            .await?;
        tracing::debug!(user_id = %user.id, expires_at = %refresh.expires_at, "Refresh token stored");

        Ok(Session {
            user,
            access_token,
            refresh_token: refresh.token,
        })
    }

    /// Exchange a stored, unexpired refresh token for a new access token.
    ///
    /// The refresh token itself is not rotated.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<String, AppError> {
        let token = match refresh_token {
            Some(t) if !t.is_empty() => t,
            _ => {
                return Err(AuthError::MissingToken("Refresh token required".to_string()).into())
            }
        };

        if !self.refresh_tokens.exists(token).await? {
            tracing::warn!("Refresh token not found in store");
            return Err(AuthError::TokenInvalid("Invalid refresh token".to_string()).into());
        }

        let claims = self.tokens.verify_refresh(token).map_err(|e| match e {
            TokenError::Expired => {
                AppError::Auth(AuthError::TokenExpired("Refresh token expired".to_string()))
            }
            TokenError::Invalid => {
                AppError::Auth(AuthError::TokenInvalid("Invalid refresh token".to_string()))
            }
            TokenError::Internal(msg) => AppError::Internal(msg),
        })?;

        let user_id = claims.user_id()?;
        let access_token = self.tokens.issue_access_token(user_id)?;
        tracing::info!(user_id = %user_id, "Access token refreshed");
        Ok(access_token)
    }

    /// End the session identified by the caller's refresh token cookie.
    ///
    /// Only a token owned by `user_id` is deleted. Missing, unknown or
    /// already-deleted tokens are not an error.
    pub async fn logout(&self, user_id: Uuid, refresh_token: Option<&str>) -> Result<(), AppError> {
        let Some(token) = refresh_token.filter(|t| !t.is_empty()) else {
            tracing::debug!(user_id = %user_id, "Logout without refresh token cookie");
            return Ok(());
        };

        match self.refresh_tokens.owner(token).await? {
            Some(owner) if owner == user_id => {
                self.refresh_tokens.delete_by_token(token).await?;
                tracing::info!(user_id = %user_id, "User logged out");
            }
            Some(owner) => {
                tracing::warn!(
                    user_id = %user_id,
                    owner = %owner,
                    "Logout presented a refresh token owned by another user"
                );
            }
            None => {
                tracing::debug!(user_id = %user_id, "Refresh token already revoked");
            }
        }

        Ok(())
    }
}

fn validate_profile(input: &RegisterInput) -> Result<Profile, ValidationError> {
    let links = input.social_links.clone().unwrap_or_default();
    let link = |name: &str, value: &Option<String>| {
        optional_field(name, value.as_deref(), MAX_LINK_LENGTH)
    };

    Ok(Profile {
        first_name: optional_field("firstName", input.first_name.as_deref(), MAX_NAME_LENGTH)?,
        last_name: optional_field("lastName", input.last_name.as_deref(), MAX_NAME_LENGTH)?,
        social_links: SocialLinks {
            website: link("website", &links.website)?,
            facebook: link("facebook", &links.facebook)?,
            instagram: link("instagram", &links.instagram)?,
            x: link("x", &links.x)?,
            youtube: link("youtube", &links.youtube)?,
        },
    })
}
