pub mod handlers;
pub mod repo;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/favorites", get(handlers::list_favorites))
        .route("/favorites/:trip_id", post(handlers::toggle_favorite))
}
