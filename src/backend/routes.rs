use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::backend::{handlers::{entries, notifications, users}, AppState};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/api/v1/users", user_routes())
        .nest("/api/v1/entries", entry_routes())
        .nest("/api/v1/notifications", notification_routes())
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route(
            "/me",
            get(users::get_me).patch(users::update_me).delete(users::delete_me),
        )
        .route("/me/password", patch(users::update_password))
        .route("/", get(users::list_users))
}

fn entry_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(entries::list_entries).post(entries::create_entry))
        .route("/budget-analysis", get(entries::budget_analysis))
        .route(
            "/{id}",
            get(entries::get_entry)
                .patch(entries::update_entry)
                .delete(entries::delete_entry),
        )
}

fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(notifications::list_notifications).delete(notifications::clear_notifications),
        )
        .route("/mark-all-read", patch(notifications::mark_all_read))
        .route("/{id}/read", patch(notifications::mark_read))
}
