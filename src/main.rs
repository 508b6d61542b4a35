use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cinema_booking::{
    app,
    config::{Config, LogFormat},
    AppState,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.app.rust_log));
    match config.app.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Plain => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    info!(environment = %config.app.environment, "Starting Cinema Booking API");
    if config.uses_default_secret() {
        warn!("JWT_SECRET is not set, tokens are signed with the development secret");
    }

    let bind = format!("{}:{}", config.app.host, config.app.port);
    let state = AppState::from_config(config).await?;
    let app = app(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    let addr: SocketAddr = listener.local_addr()?;
    info!("Server listening on {}", addr);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
