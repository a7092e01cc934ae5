use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Who authored a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl TryFrom<String> for MessageRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("unknown message role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AiMessage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub conversation_id: String,
    #[sqlx(try_from = "String")]
    pub role: MessageRole,
    pub content: String,
    pub created_at: OffsetDateTime,
}

impl AiMessage {
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<AiMessage, sqlx::Error> {
        sqlx::query_as::<_, AiMessage>(
            "INSERT INTO ai_messages (user_id, conversation_id, role, content) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, conversation_id, role, content, created_at",
        )
        .bind(user_id)
        .bind(conversation_id)
        .bind(role.as_str())
        .bind(content)
        .fetch_one(db)
        .await
    }

    /// All of a user's messages in chronological order.
    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> Result<Vec<AiMessage>, sqlx::Error> {
        sqlx::query_as::<_, AiMessage>(
            "SELECT id, user_id, conversation_id, role, content, created_at \
             FROM ai_messages WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    pub async fn list_by_conversation(
        db: &PgPool,
        conversation_id: &str,
        user_id: Uuid,
    ) -> Result<Vec<AiMessage>, sqlx::Error> {
        sqlx::query_as::<_, AiMessage>(
            "SELECT id, user_id, conversation_id, role, content, created_at \
             FROM ai_messages WHERE conversation_id = $1 AND user_id = $2 \
             ORDER BY created_at ASC",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    pub async fn delete_by_user(db: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ai_messages WHERE user_id = $1")
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_conversation(
        db: &PgPool,
        conversation_id: &str,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM ai_messages WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_role_round_trips_through_text() {
        for role in [MessageRole::User, MessageRole::Assistant] {
            assert_eq!(MessageRole::try_from(role.as_str().to_string()).unwrap(), role);
        }
        assert!(MessageRole::try_from("system".to_string()).is_err());
    }
}
