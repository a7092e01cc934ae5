use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::trips::repo::{ItineraryStep, PointOfInterest, Trip};

/// Characters of itinerary description shown to non-premium callers.
const ITINERARY_PREVIEW_CHARS: usize = 100;
/// Characters of point-of-interest description shown to non-premium callers.
const POI_PREVIEW_CHARS: usize = 80;
/// Points of interest shown to non-premium callers.
const POI_PREVIEW_COUNT: usize = 2;

#[derive(Debug, Deserialize)]
pub struct TripQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub country: Option<String>,
    pub is_premium: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    #[serde(default = "default_popular_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    10
}
fn default_popular_limit() -> i64 {
    3
}

#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            current_page: page,
            total_pages,
            total_items: total,
            has_next: page * limit < total,
            has_prev: page > 1,
        }
    }
}

/// Summary shape used by the public listings.
#[derive(Debug, Serialize)]
pub struct TripListItem {
    pub id: Uuid,
    pub title: String,
    pub image: String,
    pub country: String,
    pub description: String,
    pub duration: i32,
    pub budget_amount: f64,
    pub budget_currency: String,
    pub best_season: String,
    pub is_premium: bool,
    pub tags: Vec<String>,
    pub views: i64,
}

impl From<Trip> for TripListItem {
    fn from(trip: Trip) -> Self {
        Self {
            id: trip.id,
            title: trip.title,
            image: trip.image,
            country: trip.country,
            description: trip.description,
            duration: trip.duration,
            budget_amount: trip.budget_amount,
            budget_currency: trip.budget_currency,
            best_season: trip.best_season,
            is_premium: trip.is_premium,
            tags: trip.tags,
            views: trip.views,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TripListResponse {
    pub trips: Vec<TripListItem>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Serialize)]
pub struct PremiumNotice {
    pub message: String,
    pub call_to_action: String,
    pub missing_features: Vec<String>,
}

impl PremiumNotice {
    fn new() -> Self {
        Self {
            message: "some information is reserved for premium users".into(),
            call_to_action: "subscribe to unlock the full itinerary, the interactive map and expert tips".into(),
            missing_features: vec![
                "full itinerary".into(),
                "interactive map".into(),
                "expert tips".into(),
                "all points of interest".into(),
            ],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TripDetails {
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
    pub points_of_interest: Vec<PointOfInterest>,
    pub itinerary: Vec<ItineraryStep>,
    pub views: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium_notice: Option<PremiumNotice>,
}

fn truncate_preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

impl TripDetails {
    /// Full details for premium-entitled callers; a stripped preview with a
    /// premium notice otherwise.
    pub fn from_trip(trip: Trip, premium_access: bool) -> Self {
        let gated = trip.is_premium && !premium_access;

        let points_of_interest = if gated {
            trip.points_of_interest
                .0
                .into_iter()
                .take(POI_PREVIEW_COUNT)
                .map(|poi| PointOfInterest {
                    description: truncate_preview(&poi.description, POI_PREVIEW_CHARS),
                    ..poi
                })
                .collect()
        } else {
            trip.points_of_interest.0
        };

        let itinerary = if gated {
            trip.itinerary
                .0
                .into_iter()
                .map(|step| ItineraryStep {
                    description: truncate_preview(&step.description, ITINERARY_PREVIEW_CHARS),
                    ..step
                })
                .collect()
        } else {
            trip.itinerary.0
        };

        Self {
            id: trip.id,
            user_id: trip.user_id,
            title: trip.title,
            slug: trip.slug,
            description: trip.description,
            image: trip.image,
            country: trip.country,
            duration: trip.duration,
            budget_amount: trip.budget_amount,
            budget_currency: trip.budget_currency,
            best_season: trip.best_season,
            is_premium: trip.is_premium,
            is_published: trip.is_published,
            tags: trip.tags,
            points_of_interest,
            itinerary,
            views: trip.views,
            created_at: trip.created_at,
            updated_at: trip.updated_at,
            premium_notice: gated.then(PremiumNotice::new),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ViewsResponse {
    pub views: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    fn premium_trip() -> Trip {
        Trip {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Iceland Ring Road".into(),
            slug: "iceland-ring-road-1".into(),
            description: "A loop around the island".into(),
            image: "/placeholder.svg".into(),
            country: "Iceland".into(),
            duration: 10,
            budget_amount: 2500.0,
            budget_currency: "EUR".into(),
            best_season: "summer".into(),
            is_premium: true,
            is_published: true,
            tags: vec!["nature".into()],
            points_of_interest: Json(vec![
                PointOfInterest {
                    name: format!("poi-{}", 1),
                    description: "d".repeat(200),
                    image: "/placeholder.svg".into(),
                },
                PointOfInterest {
                    name: format!("poi-{}", 2),
                    description: "short".into(),
                    image: "/placeholder.svg".into(),
                },
                PointOfInterest {
                    name: format!("poi-{}", 3),
                    description: "hidden".into(),
                    image: "/placeholder.svg".into(),
                },
            ]),
            itinerary: Json(vec![ItineraryStep {
                day: 1,
                title: "Reykjavik".into(),
                description: "x".repeat(150),
                overnight: true,
            }]),
            views: 42,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn standard_callers_get_a_stripped_preview() {
        let details = TripDetails::from_trip(premium_trip(), false);

        assert_eq!(details.points_of_interest.len(), 2);
        assert!(details.points_of_interest[0].description.ends_with("..."));
        assert_eq!(details.points_of_interest[0].description.chars().count(), 83);
        assert_eq!(details.points_of_interest[1].description, "short");

        assert!(details.itinerary[0].description.ends_with("..."));
        assert_eq!(details.itinerary[0].description.chars().count(), 103);
        assert!(details.itinerary[0].overnight);

        assert!(details.premium_notice.is_some());
    }

    #[test]
    fn premium_callers_get_everything() {
        let details = TripDetails::from_trip(premium_trip(), true);
        assert_eq!(details.points_of_interest.len(), 3);
        assert_eq!(details.itinerary[0].description.len(), 150);
        assert!(details.premium_notice.is_none());
    }

    #[test]
    fn free_trips_are_never_gated() {
        let mut trip = premium_trip();
        trip.is_premium = false;
        let details = TripDetails::from_trip(trip, false);
        assert_eq!(details.points_of_interest.len(), 3);
        assert!(details.premium_notice.is_none());
    }

    #[test]
    fn short_descriptions_are_not_padded() {
        assert_eq!(truncate_preview("short", 100), "short");
        let long = "a".repeat(120);
        let preview = truncate_preview(&long, 100);
        assert_eq!(preview.chars().count(), 103);
    }

    #[test]
    fn pagination_meta_counts_pages() {
        let meta = PaginationMeta::new(2, 10, 25);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next);
        assert!(meta.has_prev);

        let last = PaginationMeta::new(3, 10, 25);
        assert!(!last.has_next);
    }
}
