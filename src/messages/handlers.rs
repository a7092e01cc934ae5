use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    messages::repo::{AiMessage, MessageRole},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub user_id: Uuid,
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub deleted: u64,
}

#[instrument(skip(state, payload))]
pub async fn create_message(
    State(state): State<AppState>,
    AuthUser(_claims): AuthUser,
    Json(payload): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<AiMessage>), AppError> {
    if payload.content.is_empty() {
        return Err(AppError::Validation("content is required".into()));
    }

    let message = AiMessage::create(
        &state.db,
        payload.user_id,
        &payload.conversation_id,
        payload.role,
        &payload.content,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

#[instrument(skip(state))]
pub async fn get_messages_by_user(
    State(state): State<AppState>,
    AuthUser(_claims): AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<AiMessage>>, AppError> {
    Ok(Json(AiMessage::list_by_user(&state.db, user_id).await?))
}

#[instrument(skip(state))]
pub async fn get_messages_by_conversation(
    State(state): State<AppState>,
    AuthUser(_claims): AuthUser,
    Path(conversation_id): Path<String>,
    Query(query): Query<ConversationQuery>,
) -> Result<Json<Vec<AiMessage>>, AppError> {
    Ok(Json(
        AiMessage::list_by_conversation(&state.db, &conversation_id, query.user_id).await?,
    ))
}

#[instrument(skip(state))]
pub async fn delete_messages_by_user(
    State(state): State<AppState>,
    AuthUser(_claims): AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, AppError> {
    let deleted = AiMessage::delete_by_user(&state.db, user_id).await?;
    Ok(Json(DeletedResponse {
        success: true,
        deleted,
    }))
}

#[instrument(skip(state))]
pub async fn delete_conversation(
    State(state): State<AppState>,
    AuthUser(_claims): AuthUser,
    Path(conversation_id): Path<String>,
    Query(query): Query<ConversationQuery>,
) -> Result<Json<DeletedResponse>, AppError> {
    let deleted =
        AiMessage::delete_conversation(&state.db, &conversation_id, query.user_id).await?;
    Ok(Json(DeletedResponse {
        success: true,
        deleted,
    }))
}
