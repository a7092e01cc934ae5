use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

const TRIP_COLUMNS: &str = "id, user_id, title, slug, description, image, country, duration, \
     budget_amount, budget_currency, best_season, is_premium, is_published, \
     tags, points_of_interest, itinerary, views, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_image")]
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItineraryStep {
    pub day: i32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub overnight: bool,
}

fn default_image() -> String {
    "/placeholder.svg".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub image: String,
    pub country: String,
    pub duration: i32,
    pub budget_amount: f64,
    pub budget_currency: String,
    pub best_season: String,
    pub is_premium: bool,
    pub is_published: bool,
    pub tags: Vec<String>,
    pub points_of_interest: Json<Vec<PointOfInterest>>,
    pub itinerary: Json<Vec<ItineraryStep>>,
    pub views: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields accepted when an admin creates a trip.
#[derive(Debug)]
pub struct NewTrip {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub image: String,
    pub country: String,
    pub duration: i32,
    pub budget_amount: f64,
    pub budget_currency: String,
    pub best_season: String,
    pub is_premium: bool,
    pub is_published: bool,
    pub tags: Vec<String>,
    pub points_of_interest: Vec<PointOfInterest>,
    pub itinerary: Vec<ItineraryStep>,
}

/// Admin-side partial update; absent fields keep their stored value.
#[derive(Debug, Default)]
pub struct TripPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub country: Option<String>,
    pub duration: Option<i32>,
    pub budget_amount: Option<f64>,
    pub budget_currency: Option<String>,
    pub best_season: Option<String>,
    pub is_premium: Option<bool>,
    pub is_published: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub points_of_interest: Option<Vec<PointOfInterest>>,
    pub itinerary: Option<Vec<ItineraryStep>>,
}

/// URL-safe slug from the title plus a millisecond suffix for uniqueness.
pub(crate) fn slugify(title: &str, now: OffsetDateTime) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-');
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    format!("{slug}-{millis}")
}

impl Trip {
    pub async fn list_published(
        db: &PgPool,
        country: Option<&str>,
        is_premium: Option<bool>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Trip>, sqlx::Error> {
        sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips \
             WHERE is_published \
               AND ($1::text IS NULL OR country ILIKE '%' || $1 || '%') \
               AND ($2::bool IS NULL OR is_premium = $2) \
             ORDER BY created_at DESC \
             LIMIT $3 OFFSET $4"
        ))
        .bind(country)
        .bind(is_premium)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    pub async fn count_published(
        db: &PgPool,
        country: Option<&str>,
        is_premium: Option<bool>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM trips \
             WHERE is_published \
               AND ($1::text IS NULL OR country ILIKE '%' || $1 || '%') \
               AND ($2::bool IS NULL OR is_premium = $2)",
        )
        .bind(country)
        .bind(is_premium)
        .fetch_one(db)
        .await
    }

    pub async fn popular(db: &PgPool, limit: i64) -> Result<Vec<Trip>, sqlx::Error> {
        sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE is_published \
             ORDER BY views DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Trip>, sqlx::Error> {
        sqlx::query_as::<_, Trip>(&format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn increment_views(db: &PgPool, id: Uuid) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE trips SET views = views + 1 WHERE id = $1 RETURNING views",
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Case-insensitive substring search over title, country and tags.
    pub async fn search(
        db: &PgPool,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Trip>, sqlx::Error> {
        let pattern = format!("%{query}%");
        sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips \
             WHERE title ILIKE $1 OR country ILIKE $1 \
                OR array_to_string(tags, ' ') ILIKE $1 \
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
            "SELECT COUNT(*) FROM trips \
             WHERE title ILIKE $1 OR country ILIKE $1 \
                OR array_to_string(tags, ' ') ILIKE $1",
        )
        .bind(&pattern)
        .fetch_one(db)
        .await
    }

    pub async fn recent(db: &PgPool, limit: i64) -> Result<Vec<Trip>, sqlx::Error> {
        sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(db)
        .await
    }

    pub async fn count_all(db: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM trips")
            .fetch_one(db)
            .await
    }

    pub async fn count_published_all(db: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM trips WHERE is_published")
            .fetch_one(db)
            .await
    }

    pub async fn create(db: &PgPool, new: NewTrip) -> Result<Trip, sqlx::Error> {
        let slug = slugify(&new.title, OffsetDateTime::now_utc());
        sqlx::query_as::<_, Trip>(&format!(
            "INSERT INTO trips \
                 (user_id, title, slug, description, image, country, duration, \
                  budget_amount, budget_currency, best_season, is_premium, is_published, \
                  tags, points_of_interest, itinerary) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {TRIP_COLUMNS}"
        ))
        .bind(new.user_id)
        .bind(&new.title)
        .bind(&slug)
        .bind(&new.description)
        .bind(&new.image)
        .bind(&new.country)
        .bind(new.duration)
        .bind(new.budget_amount)
        .bind(&new.budget_currency)
        .bind(&new.best_season)
        .bind(new.is_premium)
        .bind(new.is_published)
        .bind(&new.tags)
        .bind(Json(&new.points_of_interest))
        .bind(Json(&new.itinerary))
        .fetch_one(db)
        .await
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        patch: TripPatch,
    ) -> Result<Option<Trip>, sqlx::Error> {
        sqlx::query_as::<_, Trip>(&format!(
            "UPDATE trips \
             SET title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 image = COALESCE($4, image), \
                 country = COALESCE($5, country), \
                 duration = COALESCE($6, duration), \
                 budget_amount = COALESCE($7, budget_amount), \
                 budget_currency = COALESCE($8, budget_currency), \
                 best_season = COALESCE($9, best_season), \
                 is_premium = COALESCE($10, is_premium), \
                 is_published = COALESCE($11, is_published), \
                 tags = COALESCE($12, tags), \
                 points_of_interest = COALESCE($13, points_of_interest), \
                 itinerary = COALESCE($14, itinerary), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {TRIP_COLUMNS}"
        ))
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(&patch.image)
        .bind(&patch.country)
        .bind(patch.duration)
        .bind(patch.budget_amount)
        .bind(&patch.budget_currency)
        .bind(&patch.best_season)
        .bind(patch.is_premium)
        .bind(patch.is_published)
        .bind(&patch.tags)
        .bind(patch.points_of_interest.as_ref().map(Json))
        .bind(patch.itinerary.as_ref().map(Json))
        .fetch_optional(db)
        .await
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM trips WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn set_published(
        db: &PgPool,
        id: Uuid,
        published: bool,
    ) -> Result<Option<Trip>, sqlx::Error> {
        sqlx::query_as::<_, Trip>(&format!(
            "UPDATE trips SET is_published = $2, updated_at = now() WHERE id = $1 \
             RETURNING {TRIP_COLUMNS}"
        ))
        .bind(id)
        .bind(published)
        .fetch_optional(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_dashes() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let slug = slugify("Route 66: Chicago -> LA!", now);
        assert!(slug.starts_with("route-66-chicago-la-"));
        assert!(slug.ends_with("1700000000000"));
    }

    #[test]
    fn slugify_never_produces_leading_or_double_dashes() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let slug = slugify("  --  Côte   d'Azur  ", now);
        assert!(!slug.starts_with('-'));
        assert!(!slug.contains("--"));
    }

    #[test]
    fn itinerary_step_defaults_apply_on_deserialize() {
        let step: ItineraryStep =
            serde_json::from_str(r#"{"day": 1, "title": "Departure"}"#).unwrap();
        assert_eq!(step.description, "");
        assert!(!step.overnight);
    }
}
