use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::MaybeUser,
    error::AppError,
    state::AppState,
    trips::{
        dto::{
            PaginationMeta, PopularQuery, TripDetails, TripListItem, TripListResponse, TripQuery,
            ViewsResponse,
        },
        repo::Trip,
    },
};

#[instrument(skip(state))]
pub async fn list_trips(
    State(state): State<AppState>,
    Query(query): Query<TripQuery>,
) -> Result<Json<TripListResponse>, AppError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let offset = (page - 1) * limit;
    let country = query.country.as_deref();

    let trips = Trip::list_published(&state.db, country, query.is_premium, limit, offset).await?;
    let total = Trip::count_published(&state.db, country, query.is_premium).await?;

    Ok(Json(TripListResponse {
        trips: trips.into_iter().map(TripListItem::from).collect(),
        pagination: PaginationMeta::new(page, limit, total),
    }))
}

#[instrument(skip(state))]
pub async fn popular_trips(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> Result<Json<Vec<TripListItem>>, AppError> {
    let trips = Trip::popular(&state.db, query.limit.clamp(1, 20)).await?;
    Ok(Json(trips.into_iter().map(TripListItem::from).collect()))
}

/// Premium content is served in full to premium and admin callers; everyone
/// else gets a stripped preview. An invalid token just means anonymous here.
#[instrument(skip(state, caller))]
pub async fn get_trip(
    State(state): State<AppState>,
    MaybeUser(caller): MaybeUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TripDetails>, AppError> {
    let trip = Trip::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("roadtrip not found".into()))?;

    let premium_access = caller
        .map(|claims| claims.role.has_premium_access())
        .unwrap_or(false);

    Ok(Json(TripDetails::from_trip(trip, premium_access)))
}

#[instrument(skip(state))]
pub async fn increment_views(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ViewsResponse>, AppError> {
    let views = Trip::increment_views(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("roadtrip not found".into()))?;

    Ok(Json(ViewsResponse { views }))
}
