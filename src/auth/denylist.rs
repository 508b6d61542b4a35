use chrono::Utc;
use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::redis_client::RedisClient;

#[derive(Debug, Error)]
pub enum DenylistError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Tokens revoked by logout, remembered until they would have expired anyway.
#[derive(Clone)]
pub enum TokenDenylist {
    Redis(RedisClient),
    /// token key -> exp (seconds since the epoch)
    Memory(Arc<Mutex<HashMap<String, i64>>>),
}

impl TokenDenylist {
    pub fn in_memory() -> Self {
        TokenDenylist::Memory(Arc::new(Mutex::new(HashMap::new())))
    }

    pub fn redis(client: RedisClient) -> Self {
        TokenDenylist::Redis(client)
    }

    fn key(token: &str) -> String {
        format!("revoked_token:{:x}", Sha256::digest(token.as_bytes()))
    }

    pub async fn revoke(&self, token: &str, exp: i64) -> Result<(), DenylistError> {
        let now = Utc::now().timestamp();
        if exp <= now {
            return Ok(());
        }
        let key = Self::key(token);

        match self {
            TokenDenylist::Redis(client) => {
                let mut conn = client.conn.clone();
                let ttl = (exp - now) as u64;
                let _: () = conn.set_ex(&key, 1, ttl).await?;
            }
            TokenDenylist::Memory(entries) => {
                let mut entries = entries.lock().await;
                entries.retain(|_, until| *until > now);
                entries.insert(key, exp);
            }
        }
        info!("token revoked until {}", exp);
        Ok(())
    }

    pub async fn is_revoked(&self, token: &str) -> Result<bool, DenylistError> {
        let key = Self::key(token);
        match self {
            TokenDenylist::Redis(client) => {
                let mut conn = client.conn.clone();
                let exists: bool = conn.exists(&key).await?;
                Ok(exists)
            }
            TokenDenylist::Memory(entries) => {
                let now = Utc::now().timestamp();
                Ok(entries.lock().await.get(&key).is_some_and(|until| *until > now))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revoked_token_is_remembered_until_expiry() {
        let denylist = TokenDenylist::in_memory();
        let exp = Utc::now().timestamp() + 60;

        assert!(!denylist.is_revoked("abc").await.unwrap());
        denylist.revoke("abc", exp).await.unwrap();
        assert!(denylist.is_revoked("abc").await.unwrap());
        assert!(!denylist.is_revoked("abd").await.unwrap());
    }

    #[tokio::test]
    async fn already_expired_token_is_not_stored() {
        let denylist = TokenDenylist::in_memory();
        denylist.revoke("old", Utc::now().timestamp() - 1).await.unwrap();
        match &denylist {
            TokenDenylist::Memory(entries) => assert!(entries.lock().await.is_empty()),
            TokenDenylist::Redis(_) => unreachable!(),
        }
    }
}
