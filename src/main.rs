use std::sync::Arc;

use tokio::{net::TcpListener, signal};
use tracing_subscriber::EnvFilter;

use triage_backend::{
    auth::jwt::JwtService,
    config::AppConfig,
    db,
    identity::{Auth0Client, IdentityProvider},
    routes::create_router,
    state::AppState,
    store::{PgRecordStore, RecordStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "server",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        active_categories = ?config.active_categories,
        identity_enabled = config.identity.is_some(),
        "loaded backend configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    db::run_migrations(&pool)?;

    let identity: Option<Arc<dyn IdentityProvider>> = match config.identity.as_ref() {
        Some(identity_config) => Some(Arc::new(Auth0Client::from_config(identity_config)?)),
        None => {
            tracing::warn!("AUTH0_DOMAIN not set, user management is disabled");
            None
        }
    };

    let store: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(pool));
    let jwt = JwtService::from_config(&config)?;
    let addr = format!("{}:{}", config.server_host, config.server_port);

    let state = AppState::new(store, identity, config, jwt);
    let app = create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        tracing::info!("server received shutdown signal");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
