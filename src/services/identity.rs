use tracing::{info, warn};

use crate::auth::password::{hash_password, verify_password};
use crate::config::AdminSeed;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{
    AuthResponse, LoginRequest, MessageResponse, NewUser, RegisterRequest, Role, User, UserInfo,
};
use crate::AppState;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<AuthResponse> {
    let email = normalize_email(&req.email);

    // Быстрая проверка; гонку двух регистраций ловит уникальный индекс
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let password_hash = hash_password(req.password, state.config.jwt.bcrypt_cost).await?;
    let user = state
        .store
        .create_user(NewUser {
            name: req.name.trim().to_string(),
            email,
            password_hash,
            role: Role::User,
        })
        .await?;

    info!(user_id = user.user_id, "user registered");
    let token = state.tokens.issue(&user)?;

    Ok(AuthResponse {
        success: true,
        message: "User registered successfully".to_string(),
        token,
        user: None,
    })
}

pub async fn login(state: &AppState, req: LoginRequest) -> AppResult<AuthResponse> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = state
        .store
        .find_user_by_email(&normalize_email(&req.email))
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(req.password, user.password_hash.clone()).await? {
        return Err(invalid());
    }

    let token = state.tokens.issue(&user)?;
    info!(user_id = user.user_id, "user logged in");

    Ok(AuthResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
        user: Some(UserInfo {
            id: user.user_id,
            name: user.name,
            role: user.role,
        }),
    })
}

pub async fn logout(state: &AppState, user: &AuthUser) -> AppResult<MessageResponse> {
    state.denylist.revoke(&user.token, user.claims.exp).await?;
    info!(user_id = user.id(), "user logged out");
    Ok(MessageResponse::ok("Logged out"))
}

/// Creates the configured admin account, or promotes it when the email is
/// already registered. An existing account keeps its password.
pub async fn ensure_admin(state: &AppState, seed: &AdminSeed) -> AppResult<User> {
    let email = normalize_email(&seed.email);

    if let Some(mut user) = state.store.find_user_by_email(&email).await? {
        if !user.role.is_admin() {
            state.store.set_user_role(user.user_id, Role::Admin).await?;
            user.role = Role::Admin;
            warn!(user_id = user.user_id, "existing account promoted to admin");
        }
        return Ok(user);
    }

    let password_hash = hash_password(seed.password.clone(), state.config.jwt.bcrypt_cost).await?;
    let user = state
        .store
        .create_user(NewUser {
            name: seed.name.clone(),
            email,
            password_hash,
            role: Role::Admin,
        })
        .await?;
    info!(user_id = user.user_id, "admin account created");
    Ok(user)
}
