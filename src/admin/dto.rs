use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{Role, User};
use crate::trips::repo::{ItineraryStep, PointOfInterest, Trip};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub search: String,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_users: i64,
    pub active_users: i64,
    pub total_roadtrips: i64,
    pub published_roadtrips: i64,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub is_verified: bool,
    pub created_at: OffsetDateTime,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TripSummary {
    pub id: Uuid,
    pub title: String,
    pub country: String,
    pub best_season: String,
    pub is_published: bool,
    pub created_at: OffsetDateTime,
}

impl From<Trip> for TripSummary {
    fn from(trip: Trip) -> Self {
        Self {
            id: trip.id,
            title: trip.title,
            country: trip.country,
            best_season: trip.best_season,
            is_published: trip.is_published,
            created_at: trip.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct TripListResponse {
    pub trips: Vec<Trip>,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: Option<Role>,
    pub is_verified: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UserStatusRequest {
    pub is_verified: bool,
}

#[derive(Debug, Deserialize)]
pub struct TripStatusRequest {
    pub is_published: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateTripRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub image: Option<String>,
    #[serde(default)]
    pub country: String,
    pub duration: Option<i32>,
    pub budget_amount: Option<f64>,
    pub budget_currency: Option<String>,
    #[serde(default)]
    pub best_season: String,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub points_of_interest: Vec<PointOfInterest>,
    #[serde(default)]
    pub itinerary: Vec<ItineraryStep>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTripRequest {
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

pub(crate) const SUPPORTED_CURRENCIES: [&str; 4] = ["EUR", "USD", "CAD", "GBP"];

pub(crate) fn valid_currency(currency: &str) -> bool {
    SUPPORTED_CURRENCIES.contains(&currency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_known_currencies_are_accepted() {
        assert!(valid_currency("EUR"));
        assert!(valid_currency("GBP"));
        assert!(!valid_currency("JPY"));
        assert!(!valid_currency("eur"));
    }

    #[test]
    fn search_query_defaults() {
        let q: SearchQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 10);
        assert_eq!(q.search, "");
    }
}
