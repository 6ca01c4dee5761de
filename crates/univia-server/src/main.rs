mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use univia_api::{AppStateInner, StateConfig};
use univia_storage::{DocumentStore, DriveStore, LocalStore};

use crate::config::{Config, StorageBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "univia=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(univia_db::Database::open(&config.db_path)?);

    // Document store
    let (store, local_documents): (Arc<dyn DocumentStore>, Option<Arc<LocalStore>>) = match &config.storage {
        StorageBackend::Local { dir, public_url } => {
            let local = Arc::new(LocalStore::new(dir.clone(), public_url.clone()).await?);
            let store: Arc<dyn DocumentStore> = local.clone();
            (store, Some(local))
        }
        StorageBackend::Drive { credentials } => {
            let drive: Arc<dyn DocumentStore> = Arc::new(DriveStore::from_credentials_file(credentials).await?);
            (drive, None)
        }
    };
    info!("Documents stored via {}", store.backend());

    let state = AppStateInner::new(
        db,
        store,
        local_documents,
        StateConfig {
            jwt_secret: config.jwt_secret.clone(),
            teacher_code: config.teacher_code.clone(),
            folders: config.folders.clone(),
            max_document_bytes: config.max_upload_bytes,
        },
    );
    if config.teacher_code.is_none() {
        info!("UNIVIA_TEACHER_CODE unset; teacher registration disabled");
    }

    let app = univia_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Univia server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Univia server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
