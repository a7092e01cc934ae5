pub mod dto;
pub mod handlers;
pub mod repo;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips", get(handlers::list_trips))
        .route("/trips/popular", get(handlers::popular_trips))
        .route("/trips/:id", get(handlers::get_trip))
        .route("/trips/:id/views", post(handlers::increment_views))
}
