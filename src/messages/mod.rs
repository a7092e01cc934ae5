pub mod handlers;
pub mod repo;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", post(handlers::create_message))
        .route(
            "/messages/user/:user_id",
            get(handlers::get_messages_by_user).delete(handlers::delete_messages_by_user),
        )
        .route(
            "/messages/conversation/:conversation_id",
            get(handlers::get_messages_by_conversation).delete(handlers::delete_conversation),
        )
}
