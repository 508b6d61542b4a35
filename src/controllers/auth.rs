use axum::{extract::State, routing::post, Json, Router};
use std::sync::Arc;

use crate::error::AppResult;
use crate::extract::ValidatedJson;
use crate::middleware::AuthUser;
use crate::models::{AuthResponse, LoginRequest, MessageResponse, RegisterRequest};
use crate::services::identity;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

// POST /auth/register
async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    identity::register(&state, req).await.map(Json)
}

// POST /auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    identity::login(&state, req).await.map(Json)
}

// POST /auth/logout
async fn logout(State(state): State<Arc<AppState>>, user: AuthUser) -> AppResult<Json<MessageResponse>> {
    identity::logout(&state, &user).await.map(Json)
}
