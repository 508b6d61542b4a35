//! bcrypt hashing, moved off the async runtime threads.

use thiserror::Error;
use tokio::task;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("password worker failed: {0}")]
    Worker(#[from] task::JoinError),
}

pub async fn hash_password(password: String, cost: u32) -> Result<String, PasswordError> {
    let hashed = task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hashed)
}

/// `false` for a wrong password and for a hash bcrypt cannot parse.
pub async fn verify_password(password: String, hash: String) -> Result<bool, PasswordError> {
    let ok = task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false)).await?;
    Ok(ok)
}
