use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    admin::dto::{
        valid_currency, CreateTripRequest, SearchQuery, StatsResponse, TripListResponse,
        TripStatusRequest, TripSummary, UpdateTripRequest, UpdateUserRequest, UserListResponse,
        UserStatusRequest, UserSummary,
    },
    auth::{extractors::AdminUser, repo_types::User},
    error::AppError,
    state::AppState,
    trips::repo::{NewTrip, Trip, TripPatch},
};

const RECENT_LIMIT: i64 = 5;

#[derive(Debug, Serialize)]
pub struct RecentUsersResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct RecentTripsResponse {
    pub roadtrips: Vec<TripSummary>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn page_window(page: i64, limit: i64) -> (i64, i64, i64) {
    let page = page.max(1);
    let limit = limit.clamp(1, 100);
    (page, limit, (page - 1) * limit)
}

// DASHBOARD

#[instrument(skip(state))]
pub async fn get_stats(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
) -> Result<Json<StatsResponse>, AppError> {
    let (total_users, active_users, total_roadtrips, published_roadtrips) = tokio::try_join!(
        User::count_all(&state.db),
        User::count_verified(&state.db),
        Trip::count_all(&state.db),
        Trip::count_published_all(&state.db),
    )?;

    Ok(Json(StatsResponse {
        total_users,
        active_users,
        total_roadtrips,
        published_roadtrips,
    }))
}

#[instrument(skip(state))]
pub async fn get_recent_users(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
) -> Result<Json<RecentUsersResponse>, AppError> {
    let users = User::recent(&state.db, RECENT_LIMIT).await?;
    Ok(Json(RecentUsersResponse {
        users: users.into_iter().map(UserSummary::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn get_recent_trips(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
) -> Result<Json<RecentTripsResponse>, AppError> {
    let trips = Trip::recent(&state.db, RECENT_LIMIT).await?;
    Ok(Json(RecentTripsResponse {
        roadtrips: trips.into_iter().map(TripSummary::from).collect(),
    }))
}

// USER MANAGEMENT

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    let (_, limit, offset) = page_window(query.page, query.limit);
    let users = User::search(&state.db, &query.search, limit, offset).await?;
    let total = User::count_search(&state.db, &query.search).await?;
    Ok(Json(UserListResponse { users, total }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    let user = User::admin_update(
        &state.db,
        id,
        payload.first_name.as_deref(),
        payload.last_name.as_deref(),
        payload.phone_number.as_deref(),
        payload.role,
        payload.is_verified,
    )
    .await?
    .ok_or_else(|| AppError::NotFound("user not found".into()))?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn update_user_status(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserStatusRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let updated = User::set_verified(&state.db, id, payload.is_verified).await?;
    if !updated {
        return Err(AppError::NotFound("user not found".into()));
    }

    Ok(Json(MessageResponse {
        message: if payload.is_verified {
            "user verified".into()
        } else {
            "user unverified".into()
        },
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    info!(admin_id = %claims.sub, user_id = %id, "admin deleting user and dependent records");

    let deleted = User::delete_cascade(&state.db, id).await?;
    if !deleted {
        return Err(AppError::NotFound("user not found".into()));
    }

    Ok(Json(MessageResponse {
        message: "user and dependent records deleted".into(),
    }))
}

// TRIP MANAGEMENT

#[instrument(skip(state))]
pub async fn list_trips(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<TripListResponse>, AppError> {
    let (_, limit, offset) = page_window(query.page, query.limit);
    let trips = Trip::search(&state.db, &query.search, limit, offset).await?;
    let total = Trip::count_search(&state.db, &query.search).await?;
    Ok(Json(TripListResponse { trips, total }))
}

#[instrument(skip(state, payload))]
pub async fn create_trip(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Json(payload): Json<CreateTripRequest>,
) -> Result<(StatusCode, Json<Trip>), AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("title is required".into()));
    }
    let budget_currency = payload.budget_currency.unwrap_or_else(|| "EUR".into());
    if !valid_currency(&budget_currency) {
        return Err(AppError::Validation("unsupported budget currency".into()));
    }

    let trip = Trip::create(
        &state.db,
        NewTrip {
            user_id: claims.sub,
            title: payload.title,
            description: payload.description,
            image: payload.image.unwrap_or_else(|| "/placeholder.svg".into()),
            country: payload.country,
            duration: payload.duration.unwrap_or(7).max(1),
            budget_amount: payload.budget_amount.unwrap_or(1000.0).max(0.0),
            budget_currency,
            best_season: payload.best_season,
            is_premium: payload.is_premium,
            is_published: payload.is_published,
            tags: payload.tags,
            points_of_interest: payload.points_of_interest,
            itinerary: payload.itinerary,
        },
    )
    .await?;

    info!(admin_id = %claims.sub, trip_id = %trip.id, "roadtrip created");
    Ok((StatusCode::CREATED, Json(trip)))
}

#[instrument(skip(state, payload))]
pub async fn update_trip(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTripRequest>,
) -> Result<Json<Trip>, AppError> {
    if let Some(currency) = payload.budget_currency.as_deref() {
        if !valid_currency(currency) {
            return Err(AppError::Validation("unsupported budget currency".into()));
        }
    }

    let trip = Trip::update(
        &state.db,
        id,
        TripPatch {
            title: payload.title,
            description: payload.description,
            image: payload.image,
            country: payload.country,
            duration: payload.duration,
            budget_amount: payload.budget_amount,
            budget_currency: payload.budget_currency,
            best_season: payload.best_season,
            is_premium: payload.is_premium,
            is_published: payload.is_published,
            tags: payload.tags,
            points_of_interest: payload.points_of_interest,
            itinerary: payload.itinerary,
        },
    )
    .await?
    .ok_or_else(|| AppError::NotFound("roadtrip not found".into()))?;

    Ok(Json(trip))
}

#[instrument(skip(state))]
pub async fn delete_trip(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    let deleted = Trip::delete(&state.db, id).await?;
    if !deleted {
        return Err(AppError::NotFound("roadtrip not found".into()));
    }
    Ok(Json(MessageResponse {
        message: "roadtrip deleted".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_trip_status(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TripStatusRequest>,
) -> Result<Json<Trip>, AppError> {
    let trip = Trip::set_published(&state.db, id, payload.is_published)
        .await?
        .ok_or_else(|| AppError::NotFound("roadtrip not found".into()))?;

    info!(trip_id = %trip.id, published = payload.is_published, "roadtrip publication status changed");
    Ok(Json(trip))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_window_clamps_and_offsets() {
        assert_eq!(page_window(1, 10), (1, 10, 0));
        assert_eq!(page_window(3, 10), (3, 10, 20));
        assert_eq!(page_window(0, 10), (1, 10, 0));
        assert_eq!(page_window(2, 1000), (2, 100, 100));
    }
}
