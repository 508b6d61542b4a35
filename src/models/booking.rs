use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: i64,
    pub user_id: i64,
    pub tmdb_id: i64,
    pub theatre_id: i64,
    pub show_id: i64,
    /// Seat numbers in the order they were submitted.
    pub seats: Vec<i32>,
    pub booked_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub user_id: i64,
    pub tmdb_id: i64,
    pub theatre_id: i64,
    pub show_id: i64,
    pub seats: Vec<i32>,
}

/// A booking with the theatre, show and movie it points at. References are
/// soft, so every joined column may be missing.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct BookingDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: Booking,
    pub theatre_name: Option<String>,
    pub theatre_city: Option<String>,
    pub show_time: Option<NaiveDateTime>,
    pub movie_title: Option<String>,
    pub poster_path: Option<String>,
}

// POST /api/book
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateBookingRequest {
    #[validate(range(min = 1, message = "user_id is required"))]
    pub user_id: i64,
    #[validate(range(min = 1, message = "tmdb_id is required"))]
    pub tmdb_id: i64,
    #[validate(range(min = 1, message = "theatre_id is required"))]
    pub theatre_id: i64,
    #[validate(range(min = 1, message = "show_id is required"))]
    pub show_id: i64,
    #[validate(length(min = 1, message = "select at least one seat"))]
    pub selected_seats: Vec<i32>,
}

impl From<CreateBookingRequest> for NewBooking {
    fn from(req: CreateBookingRequest) -> Self {
        NewBooking {
            user_id: req.user_id,
            tmdb_id: req.tmdb_id,
            theatre_id: req.theatre_id,
            show_id: req.show_id,
            seats: req.selected_seats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatAvailability {
    pub show_id: i64,
    pub capacity: i32,
    /// Claimed seats, ascending.
    pub booked: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Stats {
    pub users: i64,
    pub theatres: i64,
    pub shows: i64,
    pub bookings: i64,
}
