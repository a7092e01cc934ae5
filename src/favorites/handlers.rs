use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser, error::AppError, favorites::repo, state::AppState,
    trips::dto::TripListItem, trips::repo::Trip,
};

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub favorited: bool,
}

#[derive(Debug, Serialize)]
pub struct FavoriteTrip {
    #[serde(flatten)]
    pub trip: TripListItem,
    pub is_favorite: bool,
}

#[derive(Debug, Serialize)]
pub struct FavoritesResponse {
    pub roadtrips: Vec<FavoriteTrip>,
}

#[instrument(skip(state))]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<ToggleResponse>, AppError> {
    // Favoriting something that does not exist is a 404, not an FK error.
    if Trip::find_by_id(&state.db, trip_id).await?.is_none() {
        return Err(AppError::NotFound("roadtrip not found".into()));
    }

    let favorited = repo::toggle(&state.db, claims.sub, trip_id).await?;
    Ok(Json(ToggleResponse { favorited }))
}

#[instrument(skip(state))]
pub async fn list_favorites(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<FavoritesResponse>, AppError> {
    let trips = repo::list_for_user(&state.db, claims.sub).await?;
    let roadtrips = trips
        .into_iter()
        .map(|trip| FavoriteTrip {
            trip: TripListItem::from(trip),
            is_favorite: true,
        })
        .collect();
    Ok(Json(FavoritesResponse { roadtrips }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn favorite_trip_flattens_the_summary() {
        let trip = TripListItem {
            id: Uuid::new_v4(),
            title: "t".into(),
            image: "/placeholder.svg".into(),
            country: "France".into(),
            description: String::new(),
            duration: 7,
            budget_amount: 1000.0,
            budget_currency: "EUR".into(),
            best_season: String::new(),
            is_premium: false,
            tags: vec![],
            views: 0,
        };
        let json = serde_json::to_string(&FavoriteTrip {
            trip,
            is_favorite: true,
        })
        .unwrap();
        assert!(json.contains(r#""is_favorite":true"#));
        assert!(json.contains(r#""country":"France""#));
        assert!(!json.contains(r#""trip":"#));
    }
}
