//! In-process backend, used when no `DATABASE_URL` is configured and by the
//! test suite. All state sits behind one async mutex, so the seat check and the
//! seat claim of a booking happen in a single critical section.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Booking, BookingDetails, Movie, NewBooking, NewUser, Role, Show, ShowRequest, Stats, Theatre,
    TheatreRequest, User, UserSummary,
};

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: BTreeMap<i64, User>,
    theatres: BTreeMap<i64, Theatre>,
    shows: BTreeMap<i64, Show>,
    movies: BTreeMap<i64, Movie>,
    bookings: BTreeMap<i64, Booking>,
    /// (show_id, seat_number) -> booking_id
    seat_claims: HashMap<(i64, i32), i64>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn details(&self, booking: &Booking) -> BookingDetails {
        let theatre = self.theatres.get(&booking.theatre_id);
        let movie = self.movies.get(&booking.tmdb_id);
        BookingDetails {
            booking: booking.clone(),
            theatre_name: theatre.map(|t| t.name.clone()),
            theatre_city: theatre.map(|t| t.city.clone()),
            show_time: self.shows.get(&booking.show_id).map(|s| s.show_time),
            movie_title: movie.map(|m| m.title.clone()),
            poster_path: movie.and_then(|m| m.poster_path.clone()),
        }
    }

    fn details_newest_first<'a>(&self, bookings: impl Iterator<Item = &'a Booking>) -> Vec<BookingDetails> {
        let mut rows: Vec<BookingDetails> = bookings.map(|b| self.details(b)).collect();
        rows.sort_by(|a, b| {
            b.booking
                .booked_at
                .cmp(&a.booking.booked_at)
                .then(b.booking.booking_id.cmp(&a.booking.booking_id))
        });
        rows
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail(user.email));
        }
        let user_id = inner.next_id();
        let created = User {
            user_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now().naive_utc(),
        };
        inner.users.insert(user_id, created.clone());
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        Ok(self.inner.lock().await.users.get(&user_id).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<UserSummary>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().rev().map(User::summary).collect())
    }

    async fn set_user_role(&self, user_id: i64, role: Role) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        Ok(match inner.users.get_mut(&user_id) {
            Some(user) => {
                user.role = role;
                true
            }
            None => false,
        })
    }

    async fn delete_user(&self, user_id: i64) -> StoreResult<bool> {
        Ok(self.inner.lock().await.users.remove(&user_id).is_some())
    }

    async fn list_theatres(&self) -> StoreResult<Vec<Theatre>> {
        Ok(self.inner.lock().await.theatres.values().rev().cloned().collect())
    }

    async fn find_theatre(&self, theatre_id: i64) -> StoreResult<Option<Theatre>> {
        Ok(self.inner.lock().await.theatres.get(&theatre_id).cloned())
    }

    async fn create_theatre(&self, theatre: TheatreRequest) -> StoreResult<Theatre> {
        let mut inner = self.inner.lock().await;
        let theatre_id = inner.next_id();
        let created = Theatre {
            theatre_id,
            address: theatre.normalized_address(),
            name: theatre.name,
            city: theatre.city,
        };
        inner.theatres.insert(theatre_id, created.clone());
        Ok(created)
    }

    async fn update_theatre(&self, theatre_id: i64, theatre: TheatreRequest) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        Ok(match inner.theatres.get_mut(&theatre_id) {
            Some(existing) => {
                existing.address = theatre.normalized_address();
                existing.name = theatre.name;
                existing.city = theatre.city;
                true
            }
            None => false,
        })
    }

    async fn delete_theatre(&self, theatre_id: i64) -> StoreResult<bool> {
        Ok(self.inner.lock().await.theatres.remove(&theatre_id).is_some())
    }

    async fn list_shows(&self) -> StoreResult<Vec<Show>> {
        let inner = self.inner.lock().await;
        let mut shows: Vec<Show> = inner.shows.values().cloned().collect();
        shows.sort_by(|a, b| b.show_time.cmp(&a.show_time).then(b.show_id.cmp(&a.show_id)));
        Ok(shows)
    }

    async fn shows_for_theatre(&self, theatre_id: i64, tmdb_id: Option<i64>) -> StoreResult<Vec<Show>> {
        let inner = self.inner.lock().await;
        let mut shows: Vec<Show> = inner
            .shows
            .values()
            .filter(|s| s.theatre_id == theatre_id && tmdb_id.map_or(true, |id| s.tmdb_id == id))
            .cloned()
            .collect();
        shows.sort_by(|a, b| a.show_time.cmp(&b.show_time).then(a.show_id.cmp(&b.show_id)));
        Ok(shows)
    }

    async fn find_show(&self, show_id: i64) -> StoreResult<Option<Show>> {
        Ok(self.inner.lock().await.shows.get(&show_id).cloned())
    }

    async fn create_show(&self, show: ShowRequest) -> StoreResult<Show> {
        let mut inner = self.inner.lock().await;
        let show_id = inner.next_id();
        let created = Show {
            show_id,
            theatre_id: show.theatre_id,
            tmdb_id: show.tmdb_id,
            show_time: show.show_time,
            ticket_price: show.ticket_price,
        };
        inner.shows.insert(show_id, created.clone());
        Ok(created)
    }

    async fn update_show(&self, show_id: i64, show: ShowRequest) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        Ok(match inner.shows.get_mut(&show_id) {
            Some(existing) => {
                existing.theatre_id = show.theatre_id;
                existing.tmdb_id = show.tmdb_id;
                existing.show_time = show.show_time;
                existing.ticket_price = show.ticket_price;
                true
            }
            None => false,
        })
    }

    async fn delete_show(&self, show_id: i64) -> StoreResult<bool> {
        Ok(self.inner.lock().await.shows.remove(&show_id).is_some())
    }

    async fn list_movies(&self) -> StoreResult<Vec<Movie>> {
        Ok(self.inner.lock().await.movies.values().rev().cloned().collect())
    }

    async fn upsert_movie(&self, movie: Movie) -> StoreResult<()> {
        self.inner.lock().await.movies.insert(movie.tmdb_id, movie);
        Ok(())
    }

    async fn delete_movie(&self, tmdb_id: i64) -> StoreResult<bool> {
        Ok(self.inner.lock().await.movies.remove(&tmdb_id).is_some())
    }

    async fn create_booking(&self, booking: NewBooking) -> StoreResult<Booking> {
        let mut inner = self.inner.lock().await;

        let mut taken: Vec<i32> = booking
            .seats
            .iter()
            .copied()
            .filter(|seat| inner.seat_claims.contains_key(&(booking.show_id, *seat)))
            .collect();
        if !taken.is_empty() {
            taken.sort_unstable();
            taken.dedup();
            return Err(StoreError::SeatsTaken(taken));
        }

        let booking_id = inner.next_id();
        for seat in &booking.seats {
            inner.seat_claims.insert((booking.show_id, *seat), booking_id);
        }
        let created = Booking {
            booking_id,
            user_id: booking.user_id,
            tmdb_id: booking.tmdb_id,
            theatre_id: booking.theatre_id,
            show_id: booking.show_id,
            seats: booking.seats,
            booked_at: Utc::now().naive_utc(),
        };
        inner.bookings.insert(booking_id, created.clone());
        Ok(created)
    }

    async fn find_booking(&self, booking_id: i64) -> StoreResult<Option<Booking>> {
        Ok(self.inner.lock().await.bookings.get(&booking_id).cloned())
    }

    async fn bookings_for_user(&self, user_id: i64) -> StoreResult<Vec<BookingDetails>> {
        let inner = self.inner.lock().await;
        Ok(inner.details_newest_first(inner.bookings.values().filter(|b| b.user_id == user_id)))
    }

    async fn list_bookings(&self) -> StoreResult<Vec<BookingDetails>> {
        let inner = self.inner.lock().await;
        Ok(inner.details_newest_first(inner.bookings.values()))
    }

    async fn delete_booking(&self, booking_id: i64) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.bookings.remove(&booking_id) {
            Some(removed) => {
                for seat in &removed.seats {
                    inner.seat_claims.remove(&(removed.show_id, *seat));
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn claimed_seats(&self, show_id: i64) -> StoreResult<Vec<i32>> {
        let inner = self.inner.lock().await;
        let mut seats: Vec<i32> = inner
            .seat_claims
            .keys()
            .filter(|(show, _)| *show == show_id)
            .map(|(_, seat)| *seat)
            .collect();
        seats.sort_unstable();
        Ok(seats)
    }

    async fn stats(&self) -> StoreResult<Stats> {
        let inner = self.inner.lock().await;
        Ok(Stats {
            users: inner.users.len() as i64,
            theatres: inner.theatres.len() as i64,
            shows: inner.shows.len() as i64,
            bookings: inner.bookings.len() as i64,
        })
    }
}
