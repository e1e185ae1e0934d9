use axum::{extract::State, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backend::auth::{self, AuthUser};
use crate::backend::extract::AppJson;
use crate::backend::validate::{check_new_password, non_negative_limit, normalize_email, required_text};
use crate::backend::AppState;
use crate::database::db::queries;
use crate::database::models::{NewUser, Role, User, UserChanges};
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub budget_limit: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub budget_limit: Option<Decimal>,
    // only present to reject password changes on this route
    pub password: Option<serde_json::Value>,
    pub password_confirm: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub results: usize,
    pub data: Vec<User>,
}

fn email_taken(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("Email is already registered".to_string())
        }
        other => other.into(),
    }
}

async fn load_user(state: &AppState, user_id: i64) -> AppResult<User> {
    queries::get_user_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let name = required_text(&payload.name, "Name")?;
    let email = normalize_email(&payload.email)?;
    check_new_password(&payload.password, &payload.password_confirm)?;
    let budget_limit = non_negative_limit(payload.budget_limit.unwrap_or(Decimal::ZERO))?;

    let password_hash = auth::hash_password(payload.password, state.config.password_hash_rounds).await?;

    let user = queries::create_user(
        &state.db,
        &NewUser {
            name: &name,
            email: &email,
            password_hash: &password_hash,
            role: Role::User,
            budget_limit,
        },
    )
    .await
    .map_err(email_taken)?;

    info!(user_id = user.id, "user registered");

    let token = auth::issue_token(&state, user.id, user.role)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation("Please provide email and password".to_string()));
    }

    let email = payload.email.trim().to_lowercase();
    let incorrect = || AppError::Unauthorized("Incorrect email or password".to_string());

    let Some(user) = queries::get_user_by_email(&state.db, &email).await? else {
        // same key-stretching cost as a real check, so unknown emails are not faster
        let dummy = auth::password::dummy_hash(state.config.password_hash_rounds);
        auth::verify_password(payload.password, dummy).await?;
        return Err(incorrect());
    };

    if !auth::verify_password(payload.password, user.password_hash.clone()).await? {
        return Err(incorrect());
    }

    info!(user_id = user.id, "user logged in");

    let token = auth::issue_token(&state, user.id, user.role)?;
    Ok(Json(AuthResponse { token, user }))
}

pub async fn get_me(auth: AuthUser, State(state): State<AppState>) -> AppResult<Json<User>> {
    Ok(Json(load_user(&state, auth.id).await?))
}

pub async fn update_me(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateMeRequest>,
) -> AppResult<Json<User>> {
    if payload.password.is_some() || payload.password_confirm.is_some() {
        return Err(AppError::Validation(
            "This route is not for password updates. Please use /users/me/password".to_string(),
        ));
    }

    let changes = UserChanges {
        name: payload.name.as_deref().map(|n| required_text(n, "Name")).transpose()?,
        email: payload.email.as_deref().map(normalize_email).transpose()?,
        budget_limit: payload.budget_limit.map(non_negative_limit).transpose()?,
    };

    let user = queries::update_user(&state.db, auth.id, &changes)
        .await
        .map_err(email_taken)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    info!(user_id = user.id, "profile updated");
    Ok(Json(user))
}

pub async fn update_password(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdatePasswordRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = load_user(&state, auth.id).await?;

    if !auth::verify_password(payload.current_password, user.password_hash.clone()).await? {
        return Err(AppError::Unauthorized("Your current password is wrong".to_string()));
    }
    check_new_password(&payload.new_password, &payload.new_password_confirm)?;

    let password_hash = auth::hash_password(payload.new_password, state.config.password_hash_rounds).await?;
    queries::update_password_hash(&state.db, user.id, &password_hash).await?;

    info!(user_id = user.id, "password changed");

    let token = auth::issue_token(&state, user.id, user.role)?;
    let user = load_user(&state, user.id).await?;
    Ok(Json(AuthResponse { token, user }))
}

pub async fn delete_me(auth: AuthUser, State(state): State<AppState>) -> AppResult<StatusCode> {
    if !queries::delete_user(&state.db, auth.id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    info!(user_id = auth.id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_users(auth: AuthUser, State(state): State<AppState>) -> AppResult<Json<UsersResponse>> {
    auth.require_role(Role::Admin)?;

    let users = queries::get_all_users(&state.db).await?;
    Ok(Json(UsersResponse {
        results: users.len(),
        data: users,
    }))
}
