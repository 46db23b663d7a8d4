use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kanzleihub_api::config::Config;
use kanzleihub_api::identity::store::StoreIdentityProvider;
use kanzleihub_api::store::postgres::PgStore;
use kanzleihub_api::store::DocumentStore;
use kanzleihub_api::{build_router, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let store: Arc<dyn DocumentStore> = Arc::new(PgStore::new(pool));
    let identity = Arc::new(StoreIdentityProvider::new(
        store.clone(),
        config.session_max_age_days,
    ));

    let state = AppState::new(store, identity, config.clone());
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("kanzleihub API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
