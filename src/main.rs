mod clock;
mod config;
mod errors;
mod extractors;
mod instrumentation;
mod models;
mod repository;
mod routes;
mod storage;
mod utilities;

#[cfg(not(unix))]
use std::future;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Extension, Router,
};
use clock::{Clock, SystemClock};
use config::{load_config, Config, DEFAULT_CONFIG_PATH};
use errors::AppResult;
use repository::{FileRepository, PgFiles};
use routes::{download::download_endpoint, files::list_endpoint, upload::upload_endpoint};
use sqlx::postgres::PgPoolOptions;
use storage::{ObjectStore, S3Store};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{AllowOrigin, CorsLayer};

#[derive(Clone)]
struct AppContext {
    cfg: Arc<Config>,
    files: Arc<dyn FileRepository>,
    objects: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
}

fn router(ctx: AppContext) -> AppResult<Router> {
    let max_upload_bytes = ctx.cfg.general.max_upload_bytes;
    let cors_origin = ctx.cfg.general.cors_origin.clone();

    let mut router = Router::new()
        .route("/upload", post(upload_endpoint))
        .route("/download/:id", get(download_endpoint))
        .route("/files", get(list_endpoint))
        .layer((DefaultBodyLimit::max(max_upload_bytes), Extension(ctx)));

    if let Some(origin) = cors_origin {
        let origin = HeaderValue::from_str(&origin).context("invalid general.cors_origin")?;
        router = router.layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_origin(AllowOrigin::exact(origin)),
        );
    }

    Ok(instrumentation::add_layer(router))
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let config_path =
        std::env::var("FILESHARE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = load_config(&config_path).await?;

    instrumentation::setup(&cfg.instrumentation.directives)?;

    let db = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.url)
        .await?;
    let files = PgFiles::new(db);
    files.migrate().await?;

    let objects = S3Store::new(&cfg.storage).context("failed to set up object store")?;
    tracing::info!("storing uploads in {objects:?}");

    let address = cfg.general.bind_address();
    let ctx = AppContext {
        cfg: Arc::new(cfg),
        files: Arc::new(files),
        objects: Arc::new(objects),
        clock: Arc::new(SystemClock),
    };

    let listener = TcpListener::bind(&address).await?;
    tracing::info!("api is available on http://{address}");

    axum::serve(listener, router(ctx)?)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
