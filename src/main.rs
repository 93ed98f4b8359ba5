use std::sync::Arc;

use student_portal::api::router;
use student_portal::config::{PortalConfig, StoreBackend};
use student_portal::identity::{HttpIdentityProvider, IdentityProvider};
use student_portal::state::AppState;
use student_portal::store::{RecordStore, RestStore, SqliteStore};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "student_portal=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PortalConfig::new_from_env()?;

    let identity: Arc<dyn IdentityProvider> = Arc::new(HttpIdentityProvider::new(
        &config.backend_url,
        &config.anon_key,
        config.request_timeout,
    )?);

    let store: Arc<dyn RecordStore> = match config.store {
        StoreBackend::Sqlite => {
            let store = SqliteStore::connect(&config.database_url, config.request_timeout).await?;
            store.migrate().await?;
            info!("using sqlite record store at {}", config.database_url);
            Arc::new(store)
        }
        StoreBackend::Rest => {
            info!("using remote record store at {}", config.backend_url);
            Arc::new(
                RestStore::new(&config.backend_url, &config.anon_key, config.request_timeout)?
                    .with_identity(identity.clone()),
            )
        }
    };

    let app = router(AppState { store, identity });

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
