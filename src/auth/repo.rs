use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, Role, User};

const USER_COLUMNS: &str = "id, email, phone_number, password_hash, first_name, last_name, \
     role, is_verified, verification_token, reset_code, reset_code_expires, \
     oauth_provider, oauth_provider_id, created_at, updated_at";

impl User {
    /// Exact-match lookup; emails are stored and compared as given.
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_verification_token(
        db: &PgPool,
        token: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE verification_token = $1"
        ))
        .bind(token)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_phone(db: &PgPool, phone: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE phone_number = $1"
        ))
        .bind(phone)
        .fetch_optional(db)
        .await
    }

    /// Matches email, exact code and an unexpired expiry in one query.
    pub async fn find_by_reset_code(
        db: &PgPool,
        email: &str,
        code: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE email = $1 AND reset_code = $2 AND reset_code_expires > now()"
        ))
        .bind(email)
        .bind(code)
        .fetch_optional(db)
        .await
    }

    pub async fn create(db: &PgPool, new: NewUser<'_>) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users \
                 (email, password_hash, first_name, last_name, is_verified, \
                  verification_token, oauth_provider, oauth_provider_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(new.email)
        .bind(&new.password_hash)
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.is_verified)
        .bind(&new.verification_token)
        .bind(new.oauth_provider)
        .bind(new.oauth_provider_id)
        .fetch_one(db)
        .await
    }

    /// Flip to verified and clear the one-time token. Idempotence is handled
    /// by the caller; the write itself is unconditional.
    pub async fn mark_verified(db: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET is_verified = TRUE, verification_token = NULL, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn set_reset_code(
        db: &PgPool,
        id: Uuid,
        code: &str,
        expires: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET reset_code = $2, reset_code_expires = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(code)
        .bind(expires)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Conditional single-statement write: the password only changes if the
    /// code is still the one on record and unexpired. A concurrent password
    /// change or code regeneration makes this match zero rows.
    pub async fn reset_password_with_code(
        db: &PgPool,
        email: &str,
        code: &str,
        new_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users \
             SET password_hash = $3, reset_code = NULL, reset_code_expires = NULL, \
                 updated_at = now() \
             WHERE email = $1 AND reset_code = $2 AND reset_code_expires > now()",
        )
        .bind(email)
        .bind(code)
        .bind(new_hash)
        .execute(db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// A password change invalidates any in-flight reset in the same write.
    pub async fn update_password(db: &PgPool, id: Uuid, new_hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users \
             SET password_hash = $2, reset_code = NULL, reset_code_expires = NULL, \
                 updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(new_hash)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Partial profile update. `set_phone` distinguishes "leave the phone
    /// alone" from "set it to the given value (possibly NULL)".
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
        set_phone: bool,
        phone: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET first_name = COALESCE($2, first_name), \
                 last_name = COALESCE($3, last_name), \
                 phone_number = CASE WHEN $4 THEN $5 ELSE phone_number END, \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .bind(set_phone)
        .bind(phone)
        .fetch_optional(db)
        .await
    }

    /// Admin-side partial update.
    pub async fn admin_update(
        db: &PgPool,
        id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
        phone: Option<&str>,
        role: Option<Role>,
        is_verified: Option<bool>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET first_name = COALESCE($2, first_name), \
                 last_name = COALESCE($3, last_name), \
                 phone_number = COALESCE($4, phone_number), \
                 role = COALESCE($5, role), \
                 is_verified = COALESCE($6, is_verified), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .bind(phone)
        .bind(role.map(Role::as_str))
        .bind(is_verified)
        .fetch_optional(db)
        .await
    }

    pub async fn set_verified(db: &PgPool, id: Uuid, verified: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET is_verified = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(verified)
        .execute(db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Case-insensitive substring search over name and email, newest first.
    pub async fn search(
        db: &PgPool,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, sqlx::Error> {
        let pattern = format!("%{query}%");
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE email ILIKE $1 OR first_name ILIKE $1 OR last_name ILIKE $1 \
             ORDER BY created_at DESC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    pub async fn count_search(db: &PgPool, query: &str) -> Result<i64, sqlx::Error> {
        let pattern = format!("%{query}%");
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users \
             WHERE email ILIKE $1 OR first_name ILIKE $1 OR last_name ILIKE $1",
        )
        .bind(&pattern)
        .fetch_one(db)
        .await
    }

    pub async fn recent(db: &PgPool, limit: i64) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(db)
        .await
    }

    pub async fn count_all(db: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(db)
            .await
    }

    pub async fn count_verified(db: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE is_verified")
            .fetch_one(db)
            .await
    }

    /// Delete the user and every dependent record. Best-effort sequence,
    /// not a transaction: a failure partway leaves earlier deletes in place.
    pub async fn delete_cascade(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM ai_messages WHERE user_id = $1")
            .bind(id)
            .execute(db)
            .await?;
        sqlx::query("DELETE FROM favorites WHERE user_id = $1")
            .bind(id)
            .execute(db)
            .await?;
        sqlx::query("DELETE FROM subscriptions WHERE user_id = $1")
            .bind(id)
            .execute(db)
            .await?;
        sqlx::query("DELETE FROM trips WHERE user_id = $1")
            .bind(id)
            .execute(db)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
