use axum::{
    extract::State,
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::error::AppResult;
use crate::extract::{ApiPath, ValidatedJson};
use crate::middleware::AuthUser;
use crate::models::{BookingCreated, BookingDetails, CreateBookingRequest, MessageResponse};
use crate::services::booking;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/book", post(create_booking))
        .route("/book/{booking_id}", delete(delete_booking))
        .route("/bookings/{user_id}", get(list_bookings))
}

// POST /api/book
async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateBookingRequest>,
) -> AppResult<Json<BookingCreated>> {
    booking::create_booking(&state, &user, req).await.map(Json)
}

// GET /api/bookings/{user_id}
async fn list_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(user_id): ApiPath<i64>,
) -> AppResult<Json<Vec<BookingDetails>>> {
    booking::list_bookings_for_user(&state, &user, user_id).await.map(Json)
}

// DELETE /api/book/{booking_id}
async fn delete_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(booking_id): ApiPath<i64>,
) -> AppResult<Json<MessageResponse>> {
    booking::delete_booking(&state, &user, booking_id).await.map(Json)
}
