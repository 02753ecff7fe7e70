use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod error;
mod models;
mod services;
mod storage;

use api::realtime::WsHub;
use config::Config;
use storage::{
    memory::MemoryObjects, minio::MinioClient, mock::MockStore, postgres::PgStore,
    redis::RedisClient, HttpFetcher, ObjectStore, SourceFetcher, Store,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub objects: Arc<dyn ObjectStore>,
    pub fetcher: Arc<dyn SourceFetcher>,
    pub config: Arc<Config>,
    pub ws_hub: Arc<WsHub>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sticker_albums=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load();
    tracing::info!("Starting server in {} mode", config.server.environment);

    // Rows: Postgres when configured, otherwise the demo store
    let store: Arc<dyn Store> = match &config.database.url {
        Some(url) => {
            let db = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(url)
                .await?;
            tracing::info!("Connected to PostgreSQL");

            sqlx::migrate!("./migrations").run(&db).await?;
            tracing::info!("Database migrations completed");

            Arc::new(PgStore::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, running on mock data as the demo user");
            Arc::new(MockStore::with_demo_data())
        }
    };

    // Objects: MinIO when configured, otherwise kept in memory and served from /storage
    let (objects, fetcher): (Arc<dyn ObjectStore>, Arc<dyn SourceFetcher>) = match &config.minio
    {
        Some(minio_config) => {
            let minio = MinioClient::new(minio_config);
            minio.ensure_bucket().await?;
            tracing::info!("Connected to MinIO");

            let fetcher = HttpFetcher::new(config.archive.fetch_timeout)?;
            (
                Arc::new(minio) as Arc<dyn ObjectStore>,
                Arc::new(fetcher) as Arc<dyn SourceFetcher>,
            )
        }
        None => {
            tracing::warn!("MINIO_ENDPOINT not set, keeping objects in memory");
            let memory = Arc::new(MemoryObjects::new(&config.server.app_url));
            (
                memory.clone() as Arc<dyn ObjectStore>,
                memory as Arc<dyn SourceFetcher>,
            )
        }
    };

    // Realtime fan-out, relayed through Redis when configured
    let redis = match &config.redis.url {
        Some(url) => {
            let redis = RedisClient::new(url).await?;
            tracing::info!("Connected to Redis");
            Some(redis)
        }
        None => None,
    };
    let ws_hub = Arc::new(WsHub::new(redis));
    tokio::spawn(ws_hub.clone().run_relay());

    // Create app state
    let state = AppState {
        store,
        objects,
        fetcher,
        config: Arc::new(config.clone()),
        ws_hub,
    };

    let app = api::router::create_app(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
