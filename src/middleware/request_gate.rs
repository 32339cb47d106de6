/// Request Gate
///
/// Validates the bearer access token from the Authorization header and
/// injects the caller's identity into request extensions for handlers.
/// Trusts the signature alone; no store is consulted.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use uuid::Uuid;

use crate::auth::{TokenError, TokenService};
use crate::error::{AppError, AuthError};

/// Identity resolved from a valid access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Pull the token out of `Bearer <token>`; anything else is treated as absent
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve a bearer header into an identity, or the error the gate returns
pub fn authenticate(
    tokens: &TokenService,
    header: Option<&str>,
) -> Result<AuthenticatedUser, AppError> {
    let token = bearer_token(header).ok_or_else(|| {
        AuthError::MissingToken("Access denied, no token provided".to_string())
    })?;

    match tokens.verify_access(token) {
        Ok(claims) => Ok(AuthenticatedUser {
            user_id: claims.user_id()?,
        }),
        Err(TokenError::Expired) => Err(AuthError::TokenExpired(
            "Access token expired, request a new one with refresh token".to_string(),
        )
        .into()),
        Err(TokenError::Invalid) => {
            Err(AuthError::TokenInvalid("Invalid access token".to_string()).into())
        }
        Err(TokenError::Internal(msg)) => {
            tracing::error!(error = %msg, "Error during authentication");
            Err(AppError::Internal(msg))
        }
    }
}

/// Gate for protected routes
pub struct RequestGate {
    tokens: TokenService,
}

impl RequestGate {
    pub fn new(tokens: TokenService) -> Self {
        Self { tokens }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestGateService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequestGateService {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
        }))
    }
}

pub struct RequestGateService<S> {
    service: Rc<S>,
    tokens: TokenService,
}

impl<S, B> Service<ServiceRequest> for RequestGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match authenticate(&self.tokens, header) {
            Ok(user) => {
                req.extensions_mut().insert(user);
                tracing::debug!(user_id = %user.user_id, "Access token validated");

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => Box::pin(async move { Err::<Self::Response, Self::Error>(e.into()) }),
        }
    }
}
