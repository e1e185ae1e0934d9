use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::auth::AuthUser;
use crate::backend::extract::AppPath;
use crate::backend::AppState;
use crate::database::db::queries;
use crate::database::models::{Notification, NotificationKind};
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsResponse {
    pub unread_count: i64,
    pub data: Vec<Notification>,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

/// Records an entry mutation for the user. The mutation already happened, so
/// a failed insert is logged rather than surfaced.
pub async fn notify(state: &AppState, user_id: i64, kind: NotificationKind, title: &str) {
    let message = kind.message_for(title);
    if let Err(e) = queries::create_notification(&state.db, user_id, kind, &message).await {
        warn!(user_id, kind = kind.as_str(), error = %e, "failed to record notification");
    }
}

pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<NotificationsResponse>> {
    let data = queries::get_notifications_by_user(&state.db, auth.id).await?;
    let unread_count = queries::count_unread_notifications(&state.db, auth.id).await?;

    Ok(Json(NotificationsResponse { unread_count, data }))
}

pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<MarkAllReadResponse>> {
    let updated = queries::mark_all_notifications_read(&state.db, auth.id).await?;
    info!(user_id = auth.id, updated, "notifications marked read");

    Ok(Json(MarkAllReadResponse { updated }))
}

pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(notification_id): AppPath<i64>,
) -> AppResult<Json<Notification>> {
    queries::mark_notification_read(&state.db, auth.id, notification_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No notification found with that ID".to_string()))
}

pub async fn clear_notifications(auth: AuthUser, State(state): State<AppState>) -> AppResult<StatusCode> {
    let removed = queries::delete_notifications_by_user(&state.db, auth.id).await?;
    info!(user_id = auth.id, removed, "notifications cleared");

    Ok(StatusCode::NO_CONTENT)
}
