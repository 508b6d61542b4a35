//! `/api/admin/*`: catalog, booking and user management. Every handler takes an
//! [`AdminUser`], so the whole router is closed to non-admins.

use axum::{
    extract::State,
    routing::{delete, get, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::extract::{ApiPath, ValidatedJson};
use crate::middleware::AdminUser;
use crate::models::{
    BookingDetails, MessageResponse, Movie, MovieRequest, RoleUpdateRequest, Show, ShowRequest, Stats,
    Theatre, TheatreRequest, UserSummary,
};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(stats))
        .route("/theatres", get(list_theatres).post(create_theatre))
        .route("/theatres/{id}", put(update_theatre).delete(delete_theatre))
        .route("/shows", get(list_shows).post(create_show))
        .route("/shows/{id}", put(update_show).delete(delete_show))
        .route("/movies", get(list_movies).post(upsert_movie))
        .route("/movies/{tmdb_id}", delete(delete_movie))
        .route("/bookings", get(list_bookings))
        .route("/bookings/{id}", delete(delete_booking))
        .route("/users", get(list_users))
        .route("/users/{id}", delete(delete_user))
        .route("/users/{id}/role", put(update_role))
}

/// 404 for a mutation whose target did not exist.
fn found(changed: bool, what: &str) -> AppResult<()> {
    if changed {
        Ok(())
    } else {
        Err(AppError::not_found(what))
    }
}

async fn stats(State(state): State<Arc<AppState>>, _admin: AdminUser) -> AppResult<Json<Stats>> {
    Ok(Json(state.store.stats().await?))
}

/* ---------- theatres ---------- */

async fn list_theatres(State(state): State<Arc<AppState>>, _admin: AdminUser) -> AppResult<Json<Vec<Theatre>>> {
    Ok(Json(state.store.list_theatres().await?))
}

async fn create_theatre(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidatedJson(req): ValidatedJson<TheatreRequest>,
) -> AppResult<Json<Value>> {
    let theatre = state.store.create_theatre(req).await?;
    info!(theatre_id = theatre.theatre_id, "theatre created");
    Ok(Json(json!({ "success": true, "theatre_id": theatre.theatre_id })))
}

async fn update_theatre(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(req): ValidatedJson<TheatreRequest>,
) -> AppResult<Json<MessageResponse>> {
    found(state.store.update_theatre(id, req).await?, "Theatre")?;
    info!(theatre_id = id, "theatre updated");
    Ok(Json(MessageResponse::ok("Theatre updated")))
}

async fn delete_theatre(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<MessageResponse>> {
    found(state.store.delete_theatre(id).await?, "Theatre")?;
    info!(theatre_id = id, "theatre deleted");
    Ok(Json(MessageResponse::ok("Theatre deleted")))
}

/* ---------- shows ---------- */

async fn list_shows(State(state): State<Arc<AppState>>, _admin: AdminUser) -> AppResult<Json<Vec<Show>>> {
    Ok(Json(state.store.list_shows().await?))
}

async fn require_theatre(state: &AppState, theatre_id: i64) -> AppResult<()> {
    match state.store.find_theatre(theatre_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::not_found("Theatre")),
    }
}

async fn create_show(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidatedJson(req): ValidatedJson<ShowRequest>,
) -> AppResult<Json<Value>> {
    require_theatre(&state, req.theatre_id).await?;
    let show = state.store.create_show(req).await?;
    info!(show_id = show.show_id, theatre_id = show.theatre_id, "show created");
    Ok(Json(json!({ "success": true, "show_id": show.show_id })))
}

async fn update_show(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(req): ValidatedJson<ShowRequest>,
) -> AppResult<Json<MessageResponse>> {
    require_theatre(&state, req.theatre_id).await?;
    found(state.store.update_show(id, req).await?, "Show")?;
    info!(show_id = id, "show updated");
    Ok(Json(MessageResponse::ok("Show updated")))
}

async fn delete_show(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<MessageResponse>> {
    found(state.store.delete_show(id).await?, "Show")?;
    info!(show_id = id, "show deleted");
    Ok(Json(MessageResponse::ok("Show deleted")))
}

/* ---------- movies ---------- */

async fn list_movies(State(state): State<Arc<AppState>>, _admin: AdminUser) -> AppResult<Json<Vec<Movie>>> {
    Ok(Json(state.store.list_movies().await?))
}

async fn upsert_movie(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidatedJson(req): ValidatedJson<MovieRequest>,
) -> AppResult<Json<Value>> {
    let movie = Movie::from(req);
    let tmdb_id = movie.tmdb_id;
    state.store.upsert_movie(movie).await?;
    info!(tmdb_id, "movie mapping saved");
    Ok(Json(json!({ "success": true, "tmdb_id": tmdb_id })))
}

async fn delete_movie(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiPath(tmdb_id): ApiPath<i64>,
) -> AppResult<Json<MessageResponse>> {
    found(state.store.delete_movie(tmdb_id).await?, "Movie")?;
    info!(tmdb_id, "movie mapping deleted");
    Ok(Json(MessageResponse::ok("Movie deleted")))
}

/* ---------- bookings ---------- */

async fn list_bookings(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<BookingDetails>>> {
    Ok(Json(state.store.list_bookings().await?))
}

async fn delete_booking(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<MessageResponse>> {
    found(state.store.delete_booking(id).await?, "Booking")?;
    info!(booking_id = id, "booking deleted by admin");
    Ok(Json(MessageResponse::ok("Booking deleted")))
}

/* ---------- users ---------- */

async fn list_users(State(state): State<Arc<AppState>>, _admin: AdminUser) -> AppResult<Json<Vec<UserSummary>>> {
    Ok(Json(state.store.list_users().await?))
}

async fn update_role(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(req): ValidatedJson<RoleUpdateRequest>,
) -> AppResult<Json<MessageResponse>> {
    found(state.store.set_user_role(id, req.role).await?, "User")?;
    info!(user_id = id, role = %req.role, "user role changed");
    Ok(Json(MessageResponse::ok("Role updated")))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<MessageResponse>> {
    if admin.id() == id {
        return Err(AppError::Validation("Cannot delete your own account".to_string()));
    }
    found(state.store.delete_user(id).await?, "User")?;
    info!(user_id = id, "user deleted");
    Ok(Json(MessageResponse::ok("User deleted")))
}
