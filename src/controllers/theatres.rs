//! Public catalog: theatres, their shows and seat availability.

use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::AppResult;
use crate::extract::{ApiPath, ApiQuery};
use crate::models::{SeatAvailability, Show, Theatre};
use crate::services::booking;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/theatres", get(list_theatres))
        .route("/theatres/shows/{theatre_id}", get(shows_for_theatre))
        .route("/shows/{show_id}/seats", get(seat_availability))
}

// GET /api/theatres
async fn list_theatres(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Theatre>>> {
    Ok(Json(state.store.list_theatres().await?))
}

#[derive(Debug, Deserialize)]
struct ShowsQuery {
    tmdb_id: Option<i64>,
}

// GET /api/theatres/shows/{theatre_id}?tmdb_id=
async fn shows_for_theatre(
    State(state): State<Arc<AppState>>,
    ApiPath(theatre_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ShowsQuery>,
) -> AppResult<Json<Vec<Show>>> {
    let shows = state.store.shows_for_theatre(theatre_id, query.tmdb_id).await?;
    Ok(Json(shows))
}

// GET /api/shows/{show_id}/seats
async fn seat_availability(
    State(state): State<Arc<AppState>>,
    ApiPath(show_id): ApiPath<i64>,
) -> AppResult<Json<SeatAvailability>> {
    booking::seat_availability(&state, show_id).await.map(Json)
}
