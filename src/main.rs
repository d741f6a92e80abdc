use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use reelmatch_api::{
    api::{create_router, AppState},
    catalog::{CatalogClient, TmdbClient},
    config::Config,
    db::{
        create_pool, MovieStore, PgMovieStore, PgPreferenceStore, PgReviewStore, PgRoomStore,
        PreferenceStore, ReviewStore, RoomStore,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url, config.database_max_connections).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database ready");

    let catalog: Arc<dyn CatalogClient> = Arc::new(TmdbClient::new(
        config.catalog_api_key.clone(),
        config.catalog_api_url.clone(),
    ));
    let movies: Arc<dyn MovieStore> = Arc::new(PgMovieStore::new(pool.clone()));
    let prefs: Arc<dyn PreferenceStore> = Arc::new(PgPreferenceStore::new(pool.clone()));
    let rooms: Arc<dyn RoomStore> = Arc::new(PgRoomStore::new(pool.clone()));
    let reviews: Arc<dyn ReviewStore> = Arc::new(PgReviewStore::new(pool));

    let state = AppState::new(
        catalog,
        movies,
        prefs,
        rooms,
        reviews,
        Duration::from_secs(config.batch_validity_secs),
        config.max_sessions,
    );
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
