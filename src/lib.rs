pub mod auth;
pub mod client;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod storage;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::auth::{TokenDenylist, TokenService};
use crate::config::Config;
use crate::database::Database;
use crate::redis_client::RedisClient;
use crate::storage::{MemoryStore, PgStore, SharedStore};

// Shared state для всего приложения
pub struct AppState {
    pub store: SharedStore,
    pub tokens: TokenService,
    pub denylist: TokenDenylist,
    pub config: Config,
    /// Only present when `REDIS_URL` is configured.
    pub redis: Option<RedisClient>,
}

impl AppState {
    pub fn new(config: Config, store: SharedStore, denylist: TokenDenylist) -> Arc<Self> {
        let redis = match &denylist {
            TokenDenylist::Redis(client) => Some(client.clone()),
            TokenDenylist::Memory(_) => None,
        };
        Arc::new(Self {
            store,
            tokens: TokenService::new(&config.jwt),
            denylist,
            config,
            redis,
        })
    }

    /// Connects the configured backends and seeds the admin account.
    pub async fn from_config(config: Config) -> anyhow::Result<Arc<Self>> {
        let store: SharedStore = match &config.database.url {
            Some(url) => {
                let db = Database::connect(url, &config.database).await?;
                db.run_migrations().await?;
                Arc::new(PgStore::new(db))
            }
            None => {
                warn!("DATABASE_URL is not set, using the in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let denylist = match &config.redis.url {
            Some(url) => TokenDenylist::redis(RedisClient::connect(url).await?),
            None => {
                info!("REDIS_URL is not set, revoked tokens are kept in memory");
                TokenDenylist::in_memory()
            }
        };

        let state = Self::new(config, store, denylist);

        if let Some(seed) = &state.config.admin {
            services::identity::ensure_admin(&state, seed)
                .await
                .map_err(|e| anyhow::anyhow!("failed to seed admin account: {e}"))?;
        }

        Ok(state)
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            // Без разрешённого origin браузер отклонит cross-origin запросы
            error!("CORS_ORIGIN `{}` is not a valid header value, cross-origin requests are disabled", origin);
            layer
        }
    }
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    if let Err(e) = state.store.ping().await {
        error!("health check: store unavailable: {}", e);
        return (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE");
    }
    if let Some(redis) = &state.redis {
        if let Err(e) = redis.ping().await {
            error!("health check: redis unavailable: {}", e);
            return (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE");
        }
    }
    (StatusCode::OK, "OK")
}

pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.app.cors_origin);

    Router::new()
        .route("/", get(|| async { "Cinema Booking API v1.0" }))
        .route("/health", get(health))
        .nest("/auth", controllers::auth_routes())
        .nest("/api", controllers::api_routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
