pub mod password;
pub mod token;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use tracing::debug;

use crate::backend::AppState;
use crate::database::db::queries;
use crate::database::models::Role;
use crate::error::{AppError, AppResult};

/// The authenticated caller, resolved from `Authorization: Bearer <jwt>`.
///
/// Extraction verifies the token and reloads the user, so a token outliving
/// its account is rejected with 401.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: i64,
    pub role: Role,
}

impl AuthUser {
    pub fn require_role(&self, role: Role) -> AppResult<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            AppError::Unauthorized("You are not logged in! Please log in to get access.".to_string())
        })?;

        let claims = token::verify(token, &state.config.jwt_secret, Utc::now().timestamp()).map_err(|e| {
            debug!(error = %e, "rejected bearer token");
            AppError::Unauthorized("Invalid or expired token. Please log in again.".to_string())
        })?;

        let user = queries::get_user_by_id(&state.db, claims.id).await?.ok_or_else(|| {
            AppError::Unauthorized("The user belonging to this token no longer exists.".to_string())
        })?;

        Ok(AuthUser {
            id: user.id,
            role: user.role,
        })
    }
}

/// Runs on the blocking pool so key stretching does not stall the runtime.
pub async fn hash_password(password: String, rounds: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&password, rounds))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))
}

pub async fn verify_password(password: String, stored: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&password, &stored))
        .await
        .map_err(|e| AppError::Internal(format!("password verification task failed: {e}")))
}

pub fn issue_token(state: &AppState, user_id: i64, role: Role) -> AppResult<String> {
    token::issue(user_id, role, &state.config.jwt_secret, state.config.jwt_expires_in_hours)
        .map_err(|e| AppError::Internal(format!("could not sign token: {e}")))
}
