pub mod admin;
pub mod auth;
pub mod bookings;
pub mod theatres;

use axum::Router;
use std::sync::Arc;

use crate::AppState;

/// `/auth/*`
pub fn auth_routes() -> Router<Arc<AppState>> {
    auth::routes()
}

/// `/api/*`, with the admin surface under `/api/admin`.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(theatres::routes())
        .merge(bookings::routes())
        .nest("/admin", admin::routes())
}
