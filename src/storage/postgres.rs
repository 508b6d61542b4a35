use async_trait::async_trait;
use sqlx::PgConnection;
use tracing::{info, warn};

use super::{Store, StoreError, StoreResult};
use crate::database::Database;
use crate::models::{
    Booking, BookingDetails, Movie, NewBooking, NewUser, Role, Show, ShowRequest, Stats, Theatre,
    TheatreRequest, User, UserSummary,
};

const USER_COLUMNS: &str = "user_id, name, email, password_hash, role, created_at";
const SHOW_COLUMNS: &str = "show_id, theatre_id, tmdb_id, show_time, ticket_price";
const BOOKING_COLUMNS: &str = "booking_id, user_id, tmdb_id, theatre_id, show_id, seats, booked_at";

const BOOKING_DETAILS_SELECT: &str = r#"
    SELECT b.booking_id, b.user_id, b.tmdb_id, b.theatre_id, b.show_id, b.seats, b.booked_at,
           t.name AS theatre_name,
           t.city AS theatre_city,
           s.show_time,
           m.title AS movie_title,
           m.poster_path
    FROM bookings b
    LEFT JOIN theatres t ON t.theatre_id = b.theatre_id
    LEFT JOIN shows s ON s.show_id = b.show_id
    LEFT JOIN movies m ON m.tmdb_id = b.tmdb_id
"#;

#[derive(Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// Seats among `seats` already claimed on the show, ascending.
async fn taken_among(conn: &mut PgConnection, show_id: i64, seats: &[i32]) -> Result<Vec<i32>, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT seat_number FROM booking_seats
         WHERE show_id = $1 AND seat_number = ANY($2)
         ORDER BY seat_number",
    )
    .bind(show_id)
    .bind(seats)
    .fetch_all(conn)
    .await
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

// 40P01 deadlock_detected, 40001 serialization_failure
fn is_claim_conflict(err: &sqlx::Error) -> bool {
    is_unique_violation(err)
        || err
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == "40P01" || code == "40001")
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(self.db.ping().await?)
    }

    /* ---------- USERS ---------- */

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let res = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash, role)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.db.pool)
        .await;

        match res {
            Ok(created) => Ok(created),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateEmail(user.email)),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(user)
    }

    async fn find_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"))
            .bind(user_id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT user_id, name, email, role FROM users ORDER BY user_id DESC",
        )
        .fetch_all(&self.db.pool)
        .await?;
        Ok(users)
    }

    async fn set_user_role(&self, user_id: i64, role: Role) -> StoreResult<bool> {
        let res = sqlx::query("UPDATE users SET role = $1 WHERE user_id = $2")
            .bind(role.as_str())
            .bind(user_id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_user(&self, user_id: i64) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /* ---------- THEATRES ---------- */

    async fn list_theatres(&self) -> StoreResult<Vec<Theatre>> {
        let theatres = sqlx::query_as::<_, Theatre>(
            "SELECT theatre_id, name, city, address FROM theatres ORDER BY theatre_id DESC",
        )
        .fetch_all(&self.db.pool)
        .await?;
        Ok(theatres)
    }

    async fn find_theatre(&self, theatre_id: i64) -> StoreResult<Option<Theatre>> {
        let theatre = sqlx::query_as::<_, Theatre>(
            "SELECT theatre_id, name, city, address FROM theatres WHERE theatre_id = $1",
        )
        .bind(theatre_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(theatre)
    }

    async fn create_theatre(&self, theatre: TheatreRequest) -> StoreResult<Theatre> {
        let created = sqlx::query_as::<_, Theatre>(
            "INSERT INTO theatres (name, city, address) VALUES ($1, $2, $3)
             RETURNING theatre_id, name, city, address",
        )
        .bind(&theatre.name)
        .bind(&theatre.city)
        .bind(theatre.normalized_address())
        .fetch_one(&self.db.pool)
        .await?;
        Ok(created)
    }

    async fn update_theatre(&self, theatre_id: i64, theatre: TheatreRequest) -> StoreResult<bool> {
        let res = sqlx::query("UPDATE theatres SET name = $1, city = $2, address = $3 WHERE theatre_id = $4")
            .bind(&theatre.name)
            .bind(&theatre.city)
            .bind(theatre.normalized_address())
            .bind(theatre_id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_theatre(&self, theatre_id: i64) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM theatres WHERE theatre_id = $1")
            .bind(theatre_id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /* ---------- SHOWS ---------- */

    async fn list_shows(&self) -> StoreResult<Vec<Show>> {
        let shows = sqlx::query_as::<_, Show>(&format!(
            "SELECT {SHOW_COLUMNS} FROM shows ORDER BY show_time DESC, show_id DESC"
        ))
        .fetch_all(&self.db.pool)
        .await?;
        Ok(shows)
    }

    async fn shows_for_theatre(&self, theatre_id: i64, tmdb_id: Option<i64>) -> StoreResult<Vec<Show>> {
        let shows = sqlx::query_as::<_, Show>(&format!(
            "SELECT {SHOW_COLUMNS} FROM shows
             WHERE theatre_id = $1 AND ($2::BIGINT IS NULL OR tmdb_id = $2)
             ORDER BY show_time ASC, show_id ASC"
        ))
        .bind(theatre_id)
        .bind(tmdb_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(shows)
    }

    async fn find_show(&self, show_id: i64) -> StoreResult<Option<Show>> {
        let show = sqlx::query_as::<_, Show>(&format!("SELECT {SHOW_COLUMNS} FROM shows WHERE show_id = $1"))
            .bind(show_id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(show)
    }

    async fn create_show(&self, show: ShowRequest) -> StoreResult<Show> {
        let created = sqlx::query_as::<_, Show>(&format!(
            "INSERT INTO shows (theatre_id, tmdb_id, show_time, ticket_price)
             VALUES ($1, $2, $3, $4)
             RETURNING {SHOW_COLUMNS}"
        ))
        .bind(show.theatre_id)
        .bind(show.tmdb_id)
        .bind(show.show_time)
        .bind(show.ticket_price)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(created)
    }

    async fn update_show(&self, show_id: i64, show: ShowRequest) -> StoreResult<bool> {
        let res = sqlx::query(
            "UPDATE shows SET theatre_id = $1, tmdb_id = $2, show_time = $3, ticket_price = $4
             WHERE show_id = $5",
        )
        .bind(show.theatre_id)
        .bind(show.tmdb_id)
        .bind(show.show_time)
        .bind(show.ticket_price)
        .bind(show_id)
        .execute(&self.db.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_show(&self, show_id: i64) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM shows WHERE show_id = $1")
            .bind(show_id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /* ---------- MOVIES ---------- */

    async fn list_movies(&self) -> StoreResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(
            "SELECT tmdb_id, title, poster_path FROM movies ORDER BY tmdb_id DESC",
        )
        .fetch_all(&self.db.pool)
        .await?;
        Ok(movies)
    }

    async fn upsert_movie(&self, movie: Movie) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO movies (tmdb_id, title, poster_path) VALUES ($1, $2, $3)
             ON CONFLICT (tmdb_id) DO UPDATE
             SET title = EXCLUDED.title, poster_path = EXCLUDED.poster_path",
        )
        .bind(movie.tmdb_id)
        .bind(&movie.title)
        .bind(&movie.poster_path)
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    async fn delete_movie(&self, tmdb_id: i64) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM movies WHERE tmdb_id = $1")
            .bind(tmdb_id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /* ---------- BOOKINGS ---------- */

    async fn create_booking(&self, booking: NewBooking) -> StoreResult<Booking> {
        let mut tx = self.db.pool.begin().await?;

        // Быстрый путь: места уже заняты завершёнными бронями
        let taken = taken_among(&mut *tx, booking.show_id, &booking.seats).await?;

        if !taken.is_empty() {
            tx.rollback().await?;
            return Err(StoreError::SeatsTaken(taken));
        }

        let created = sqlx::query_as::<_, Booking>(&format!(
            "INSERT INTO bookings (user_id, tmdb_id, theatre_id, show_id, seats)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(booking.user_id)
        .bind(booking.tmdb_id)
        .bind(booking.theatre_id)
        .bind(booking.show_id)
        .bind(booking.seats.as_slice())
        .fetch_one(&mut *tx)
        .await?;

        // The primary key on (show_id, seat_number) settles concurrent claims:
        // the losing transaction waits for the winner and then fails here.
        // Claims are inserted in ascending seat order so that two overlapping
        // bookings lock index entries in the same order.
        let mut ordered = booking.seats.clone();
        ordered.sort_unstable();
        let claim = sqlx::query(
            "INSERT INTO booking_seats (show_id, seat_number, booking_id)
             SELECT $1, seat, $2 FROM UNNEST($3::INTEGER[]) AS seat
             ORDER BY seat",
        )
        .bind(booking.show_id)
        .bind(created.booking_id)
        .bind(ordered.as_slice())
        .execute(&mut *tx)
        .await;

        match claim {
            Ok(_) => {}
            Err(e) if is_claim_conflict(&e) => {
                tx.rollback().await?;
                warn!(show_id = booking.show_id, "lost seat claim race: {}", e);
                let mut conn = self.db.pool.acquire().await?;
                let mut taken = taken_among(&mut *conn, booking.show_id, &booking.seats).await?;
                if taken.is_empty() {
                    taken = booking.seats.clone();
                    taken.sort_unstable();
                }
                return Err(StoreError::SeatsTaken(taken));
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        info!(booking_id = created.booking_id, show_id = created.show_id, seats = ?created.seats, "booking stored");
        Ok(created)
    }

    async fn find_booking(&self, booking_id: i64) -> StoreResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(booking)
    }

    async fn bookings_for_user(&self, user_id: i64) -> StoreResult<Vec<BookingDetails>> {
        let rows = sqlx::query_as::<_, BookingDetails>(&format!(
            "{BOOKING_DETAILS_SELECT} WHERE b.user_id = $1 ORDER BY b.booked_at DESC, b.booking_id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(rows)
    }

    async fn list_bookings(&self) -> StoreResult<Vec<BookingDetails>> {
        let rows = sqlx::query_as::<_, BookingDetails>(&format!(
            "{BOOKING_DETAILS_SELECT} ORDER BY b.booked_at DESC, b.booking_id DESC"
        ))
        .fetch_all(&self.db.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_booking(&self, booking_id: i64) -> StoreResult<bool> {
        // booking_seats rows go with the booking (ON DELETE CASCADE)
        let res = sqlx::query("DELETE FROM bookings WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn claimed_seats(&self, show_id: i64) -> StoreResult<Vec<i32>> {
        let seats = sqlx::query_scalar::<_, i32>(
            "SELECT seat_number FROM booking_seats WHERE show_id = $1 ORDER BY seat_number",
        )
        .bind(show_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(seats)
    }

    async fn stats(&self) -> StoreResult<Stats> {
        let stats = sqlx::query_as::<_, Stats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM theatres) AS theatres,
                (SELECT COUNT(*) FROM shows) AS shows,
                (SELECT COUNT(*) FROM bookings) AS bookings
            "#,
        )
        .fetch_one(&self.db.pool)
        .await?;
        Ok(stats)
    }
}
