use sqlx::PgPool;
use uuid::Uuid;

use crate::trips::repo::Trip;

/// Insert-or-delete toggle. Returns the resulting state: true when the trip
/// is now favorited.
pub async fn toggle(db: &PgPool, user_id: Uuid, trip_id: Uuid) -> Result<bool, sqlx::Error> {
    let deleted = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND trip_id = $2")
        .bind(user_id)
        .bind(trip_id)
        .execute(db)
        .await?;

    if deleted.rows_affected() > 0 {
        return Ok(false);
    }

    sqlx::query("INSERT INTO favorites (user_id, trip_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(trip_id)
        .execute(db)
        .await?;
    Ok(true)
}

/// The caller's favorited trips, most recently favorited first.
pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> Result<Vec<Trip>, sqlx::Error> {
    sqlx::query_as::<_, Trip>(
        "SELECT t.id, t.user_id, t.title, t.slug, t.description, t.image, t.country, \
                t.duration, t.budget_amount, t.budget_currency, t.best_season, \
                t.is_premium, t.is_published, t.tags, t.points_of_interest, \
                t.itinerary, t.views, t.created_at, t.updated_at \
         FROM favorites f \
         JOIN trips t ON t.id = f.trip_id \
         WHERE f.user_id = $1 \
         ORDER BY f.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}
