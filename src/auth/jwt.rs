/// JWT Token Issuance and Verification
///
/// Access and refresh tokens share one HS256 mechanism and differ only in
/// secret, lifetime and subject. Verification is purely cryptographic and
/// never touches a store.

use std::fmt;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenKind};
use crate::configuration::JwtSettings;
use crate::error::AppError;

/// Why a token failed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    Expired,
    Invalid,
    /// Key or crypto failure unrelated to the presented token
    Internal(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Expired => write!(f, "token expired"),
            TokenError::Invalid => write!(f, "token invalid"),
            TokenError::Internal(msg) => write!(f, "token verification failed: {}", msg),
        }
    }
}

impl std::error::Error for TokenError {}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidSubject
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::ImmatureSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => TokenError::Invalid,
            _ => TokenError::Internal(err.to_string()),
        }
    }
}

/// A freshly minted refresh token and its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mints and verifies access and refresh tokens
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl TokenService {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(settings.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(settings.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(settings.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(settings.refresh_secret.as_bytes()),
            access_ttl: settings.access_token_expiry.as_secs() as i64,
            refresh_ttl: settings.refresh_token_expiry.as_secs() as i64,
        }
    }

    /// Sign `{userId}` with the access secret and access TTL
    pub fn issue_access_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let claims = Claims::new(user_id, TokenKind::Access, self.access_ttl);
        self.sign(&claims, TokenKind::Access)
    }

    /// Sign `{userId}` with the refresh secret and refresh TTL
    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<IssuedToken, AppError> {
        let claims = Claims::new(user_id, TokenKind::Refresh, self.refresh_ttl);
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AppError::Internal("Refresh token expiry out of range".to_string()))?;
        let token = self.sign(&claims, TokenKind::Refresh)?;

        Ok(IssuedToken { token, expires_at })
    }

    pub fn sign(&self, claims: &Claims, kind: TokenKind) -> Result<String, AppError> {
        let key = match kind {
            TokenKind::Access => &self.access_encoding,
            TokenKind::Refresh => &self.refresh_encoding,
        };

        encode(&Header::new(Algorithm::HS256), claims, key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Check signature, subject and expiry for the given token class
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let key = match kind {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.sub = Some(kind.subject().to_string());
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, key, &validation)?.claims;
        // the id must parse, otherwise the token was not minted here
        claims.user_id().map_err(|_| TokenError::Invalid)?;
        Ok(claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, TokenKind::Refresh)
    }
}
