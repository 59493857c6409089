use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lions::app::rate_limiter::RateLimiter;
use lions::config::{AppConfig, StoreBackend};
use lions::http;
use lions::infra::cache::RedisCache;
use lions::infra::db::Db;
use lions::infra::memory::MemoryStore;
use lions::infra::postgres::PgStore;
use lions::infra::store::SharedStore;
use lions::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let store: SharedStore = match config.store_backend {
        StoreBackend::Postgres => Arc::new(PgStore::new(Db::connect(&config).await?)),
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let rate_limiter = match config.redis_url.as_deref() {
        Some(redis_url) => {
            let cache = RedisCache::connect(redis_url).await?;
            Some(RateLimiter::new(cache, config.rate_limits))
        }
        None => {
            tracing::info!("REDIS_URL not set; rate limiting disabled");
            None
        }
    };

    let state = AppState::new(store, &config, rate_limiter)?;

    let app = http::router(state).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!("listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
