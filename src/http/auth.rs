use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::app::auth::{verify_session_token, AuthService, TokenError};
use crate::domain::user::User;
use crate::http::AppError;
use crate::AppState;

/// The resolved caller. Extracting this is the only way a handler learns
/// who is making the request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

/// Token transports, in precedence order: the Authorization header wins,
/// then the `jwt` cookie parsed out of the raw Cookie header.
const TOKEN_SOURCES: [fn(&Parts) -> Option<String>; 2] = [bearer_token, cookie_token];

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

fn cookie_token(parts: &Parts) -> Option<String> {
    let raw = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix("jwt="))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = TOKEN_SOURCES
            .iter()
            .find_map(|extract| extract(parts))
            .ok_or_else(|| {
                AppError::unauthorized("You are not logged in! Please log in to get access.")
            })?;

        let user_id =
            verify_session_token(&state.session_key, &token).map_err(|err| match err {
                TokenError::Expired => {
                    AppError::unauthorized("Your token has expired! Please log in again.")
                }
                TokenError::Invalid => {
                    AppError::unauthorized("Invalid token. Please log in again!")
                }
            })?;

        let service = AuthService::new(state.db.clone());
        let user = service.find_user(user_id).await.map_err(|err| {
            tracing::error!(error = ?err, user_id = %user_id, "failed to load token identity");
            AppError::internal("Something went wrong during authentication")
        })?;

        let user = user.ok_or_else(|| {
            AppError::unauthorized("The user belonging to this token does no longer exist.")
        })?;

        if !user.is_active {
            return Err(AppError::unauthorized(
                "Your account has been deactivated. Please contact support.",
            ));
        }

        Ok(AuthUser { user })
    }
}
