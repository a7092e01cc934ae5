pub mod dto;
pub mod handlers;

use crate::state::AppState;
use axum::{
    routing::{get, put},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(handlers::get_stats))
        .route("/admin/recent-users", get(handlers::get_recent_users))
        .route("/admin/recent-trips", get(handlers::get_recent_trips))
        .route("/admin/users", get(handlers::list_users))
        .route(
            "/admin/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/admin/users/:id/status", put(handlers::update_user_status))
        .route(
            "/admin/trips",
            get(handlers::list_trips).post(handlers::create_trip),
        )
        .route(
            "/admin/trips/:id",
            put(handlers::update_trip).delete(handlers::delete_trip),
        )
        .route("/admin/trips/:id/status", put(handlers::update_trip_status))
}
