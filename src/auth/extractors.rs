use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::auth::jwt::JwtKeys;
use crate::errors::AppError;
use crate::state::AppState;
use crate::users::repo::{User, UserRepo};

/// Resolves the bearer token to a live user row.
///
/// Missing or non-Bearer header is 401. A token that fails verification is
/// 403 with a deliberately uniform message: malformed, tampered and expired
/// tokens are indistinguishable to the client. A verified token whose
/// subject no longer exists is 404.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|_| {
            warn!("token failed verification");
            AppError::Forbidden("Could not validate credentials".into())
        })?;

        let user = UserRepo::new()
            .get_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        Ok(CurrentUser(user))
    }
}

/// [`CurrentUser`] plus the active gate. Pure predicate, no side effects.
pub struct ActiveUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for ActiveUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_active {
            return Err(AppError::BadRequest("Inactive user".into()));
        }
        Ok(ActiveUser(user))
    }
}

/// [`CurrentUser`] plus the privilege gate.
pub struct Superuser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for Superuser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_superuser {
            return Err(AppError::BadRequest(
                "The user doesn't have enough privileges".into(),
            ));
        }
        Ok(Superuser(user))
    }
}
