//! Authentication middleware
//!
//! Middleware for JWT token verification and user extraction.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{user_id_from_claims, JwtError, JwtVerifier};
use crate::models::UserRole;

/// Authenticated user extracted from the bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

/// Error response for authentication failures
#[derive(Debug, Serialize)]
struct AuthError {
    error: AuthErrorDetails,
}

#[derive(Debug, Serialize)]
struct AuthErrorDetails {
    code: String,
    message: String,
}

impl AuthError {
    fn response(status: StatusCode, code: &str, message: &str) -> Response {
        let body = Self {
            error: AuthErrorDetails {
                code: code.to_string(),
                message: message.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<JwtVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AuthError::response(
                        StatusCode::UNAUTHORIZED,
                        "MISSING_TOKEN",
                        "Authorization header with Bearer token required",
                    )
                })?;

        let verifier = Arc::<JwtVerifier>::from_ref(state);

        let claims = verifier.verify(bearer.token()).map_err(|e| {
            let (code, message) = match e {
                JwtError::TokenExpired => ("TOKEN_EXPIRED", "Token has expired"),
                _ => ("INVALID_TOKEN", "Invalid token"),
            };
            AuthError::response(StatusCode::UNAUTHORIZED, code, message)
        })?;

        let user_id = user_id_from_claims(&claims).map_err(|_| {
            AuthError::response(
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "Invalid user ID in token",
            )
        })?;

        let role = match claims.role.as_str() {
            "renter" => UserRole::Renter,
            "landlord" => UserRole::Landlord,
            "moderator" => UserRole::Moderator,
            "admin" => UserRole::Admin,
            _ => {
                return Err(AuthError::response(
                    StatusCode::UNAUTHORIZED,
                    "INVALID_TOKEN",
                    "Invalid role in token",
                ))
            }
        };

        Ok(AuthenticatedUser { user_id, role })
    }
}

/// Extractor requiring moderator (or admin) privileges
pub struct ModeratorUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for ModeratorUser
where
    Arc<JwtVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !matches!(user.role, UserRole::Moderator | UserRole::Admin) {
            return Err(AuthError::response(
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Moderator access required",
            ));
        }

        Ok(ModeratorUser(user))
    }
}
