use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;
use tracing::debug;

use crate::auth::Claims;
use crate::error::AppError;
use crate::models::{Role, User};
use crate::AppState;

/// Identity of a request carrying a valid `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: Claims,
    /// Raw token, needed to revoke it on logout.
    pub token: String,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.claims.id
    }

    /// The caller's account as stored now. The token's role may be stale and
    /// the account may have been deleted since the token was issued.
    pub async fn account(&self, state: &AppState) -> Result<User, AppError> {
        state
            .store
            .find_user(self.id())
            .await?
            .ok_or_else(|| AppError::Forbidden("Account no longer exists".to_string()))
    }
}

/// Own resource, or any resource for an admin.
pub fn may_access(account: &User, owner_id: i64) -> bool {
    account.user_id == owner_id || account.role.is_admin()
}

// Bearer JWT extractor
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Нет заголовка - 401, всё остальное - 403
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

        let token = auth_header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Forbidden("Invalid token".to_string()))?;

        let claims = state.tokens.verify(token).map_err(|e| {
            debug!("rejected token: {}", e);
            AppError::from(e)
        })?;

        if state.denylist.is_revoked(token).await? {
            return Err(AppError::Forbidden("Token has been revoked".to_string()));
        }

        Ok(AuthUser {
            claims,
            token: token.to_string(),
        })
    }
}

pub fn require_admin(role: Role) -> Result<(), AppError> {
    if role.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin access required".to_string()))
    }
}

/// An authenticated user whose stored role is `admin`.
///
/// The role is read from the store rather than from the token, so promotions
/// and demotions apply to tokens that were issued before them.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require_admin(user.account(state).await?.role)?;

        Ok(AdminUser(user))
    }
}
