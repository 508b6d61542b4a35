//! Persistence for users, the catalog (theatres, shows, movie mappings) and
//! bookings.
//!
//! Two backends implement [`Store`]: [`postgres::PgStore`] for deployments and
//! [`memory::MemoryStore`] when no database is configured. Both enforce the
//! same invariants:
//!
//! - an email belongs to at most one user;
//! - a seat of a show is held by at most one booking, and a booking either
//!   claims all of its seats or none of them;
//! - deleting a booking releases its seats.
//!
//! Everything else is referenced softly: deleting a theatre does not touch its
//! shows or bookings.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{
    Booking, BookingDetails, Movie, NewBooking, NewUser, Role, Show, ShowRequest, Stats, Theatre,
    TheatreRequest, User, UserSummary,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email {0} is already registered")]
    DuplicateEmail(String),

    /// Seats of the show that are held by other bookings, ascending.
    #[error("seats already booked: {0:?}")]
    SeatsTaken(Vec<i32>),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub type SharedStore = Arc<dyn Store>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap liveness probe for `/health`.
    async fn ping(&self) -> StoreResult<()>;

    // Users
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user(&self, user_id: i64) -> StoreResult<Option<User>>;
    /// Newest first.
    async fn list_users(&self) -> StoreResult<Vec<UserSummary>>;
    async fn set_user_role(&self, user_id: i64, role: Role) -> StoreResult<bool>;
    async fn delete_user(&self, user_id: i64) -> StoreResult<bool>;

    // Theatres
    async fn list_theatres(&self) -> StoreResult<Vec<Theatre>>;
    async fn find_theatre(&self, theatre_id: i64) -> StoreResult<Option<Theatre>>;
    async fn create_theatre(&self, theatre: TheatreRequest) -> StoreResult<Theatre>;
    async fn update_theatre(&self, theatre_id: i64, theatre: TheatreRequest) -> StoreResult<bool>;
    async fn delete_theatre(&self, theatre_id: i64) -> StoreResult<bool>;

    // Shows
    /// Latest show time first.
    async fn list_shows(&self) -> StoreResult<Vec<Show>>;
    /// Shows of one theatre, earliest first, optionally for a single movie.
    async fn shows_for_theatre(&self, theatre_id: i64, tmdb_id: Option<i64>) -> StoreResult<Vec<Show>>;
    async fn find_show(&self, show_id: i64) -> StoreResult<Option<Show>>;
    async fn create_show(&self, show: ShowRequest) -> StoreResult<Show>;
    async fn update_show(&self, show_id: i64, show: ShowRequest) -> StoreResult<bool>;
    async fn delete_show(&self, show_id: i64) -> StoreResult<bool>;

    // Movie mappings
    async fn list_movies(&self) -> StoreResult<Vec<Movie>>;
    /// Insert or replace the mapping for `movie.tmdb_id`.
    async fn upsert_movie(&self, movie: Movie) -> StoreResult<()>;
    async fn delete_movie(&self, tmdb_id: i64) -> StoreResult<bool>;

    // Bookings
    /// Stores the booking and claims its seats in one step. Fails with
    /// [`StoreError::SeatsTaken`] without writing anything when any seat is held.
    async fn create_booking(&self, booking: NewBooking) -> StoreResult<Booking>;
    async fn find_booking(&self, booking_id: i64) -> StoreResult<Option<Booking>>;
    /// Most recent first.
    async fn bookings_for_user(&self, user_id: i64) -> StoreResult<Vec<BookingDetails>>;
    /// Most recent first.
    async fn list_bookings(&self) -> StoreResult<Vec<BookingDetails>>;
    /// Removes the booking and releases its seats.
    async fn delete_booking(&self, booking_id: i64) -> StoreResult<bool>;
    /// Seats of the show held by any booking, ascending.
    async fn claimed_seats(&self, show_id: i64) -> StoreResult<Vec<i32>>;

    async fn stats(&self) -> StoreResult<Stats>;
}
