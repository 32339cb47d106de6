/// Authentication Routes
///
/// Register, login, access-token refresh and logout. The refresh token only
/// ever travels in the `refreshToken` cookie; the access token travels in the
/// JSON body and comes back as a bearer header.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, RegisterInput, Session};
use crate::error::{AppError, ValidationError};
use crate::middleware::AuthenticatedUser;
use crate::store::{Role, SocialLinks, User};

pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Cookie policy for the refresh token
#[derive(Debug, Clone, Copy)]
pub struct SessionCookie {
    /// Set the `Secure` attribute (production only)
    pub secure: bool,
}

impl SessionCookie {
    pub fn issue(&self, token: String) -> Cookie<'static> {
        Cookie::build(REFRESH_TOKEN_COOKIE, token)
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .path("/")
            .finish()
    }

    pub fn clear(&self) -> Cookie<'static> {
        let mut cookie = self.issue(String::new());
        cookie.make_removal();
        cookie
    }
}

/// Registration request; unknown fields are rejected
#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub social_links: Option<SocialLinks>,
}

impl TryFrom<RegisterRequest> for RegisterInput {
    type Error = ValidationError;

    fn try_from(body: RegisterRequest) -> Result<Self, Self::Error> {
        let role = match body.role.as_deref() {
            None => Role::default(),
            Some(raw) => raw.trim().parse()?,
        };

        Ok(RegisterInput {
            email: body.email,
            password: body.password,
            role,
            first_name: body.first_name,
            last_name: body.last_name,
            social_links: body.social_links,
        })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user; never carries the password hash
#[derive(Serialize, Deserialize, Debug)]
pub struct UserView {
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserView,
    pub access_token: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

fn session_response(session: Session, cookie: &SessionCookie) -> HttpResponse {
    HttpResponse::Created()
        .cookie(cookie.issue(session.refresh_token))
        .json(AuthResponse {
            user: UserView::from(&session.user),
            access_token: session.access_token,
        })
}

/// POST /api/v1/auth/register
///
/// # Errors
/// - 403: role `admin` requested
/// - 409: email already registered
/// - 422: invalid or unknown fields
pub async fn register(
    body: web::Json<RegisterRequest>,
    auth: web::Data<AuthService>,
    cookie: web::Data<SessionCookie>,
) -> Result<HttpResponse, AppError> {
    let input = RegisterInput::try_from(body.into_inner())?;
    let session = auth.register(input).await?;
    Ok(session_response(session, &cookie))
}

/// POST /api/v1/auth/login
///
/// # Errors
/// - 404: unknown email or wrong password (same response for both)
pub async fn login(
    body: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
    cookie: web::Data<SessionCookie>,
) -> Result<HttpResponse, AppError> {
    let session = auth.login(&body.email, &body.password).await?;
    Ok(session_response(session, &cookie))
}

/// POST /api/v1/auth/refresh-token
///
/// Reads the `refreshToken` cookie and returns a new access token.
///
/// # Errors
/// - 401: cookie missing, unknown to the store, invalid or expired
pub async fn refresh_token(
    req: HttpRequest,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let cookie = req.cookie(REFRESH_TOKEN_COOKIE);
    let access_token = auth.refresh(cookie.as_ref().map(|c| c.value())).await?;

    Ok(HttpResponse::Ok().json(RefreshResponse { access_token }))
}

/// POST /api/v1/auth/logout
///
/// **Requires a valid access token.** Revokes the session in the cookie and
/// clears it.
pub async fn logout(
    req: HttpRequest,
    user: web::ReqData<AuthenticatedUser>,
    auth: web::Data<AuthService>,
    cookie: web::Data<SessionCookie>,
) -> Result<HttpResponse, AppError> {
    let refresh = req.cookie(REFRESH_TOKEN_COOKIE);
    auth.logout(user.user_id, refresh.as_ref().map(|c| c.value()))
        .await?;

    Ok(HttpResponse::NoContent().cookie(cookie.clear()).finish())
}

/// Map JSON extractor failures (bad syntax, missing or unknown fields) to 422
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(ValidationError::MalformedBody(err.to_string())).into()
    })
}
