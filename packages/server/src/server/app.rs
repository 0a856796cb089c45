//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Extension},
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::domains::receipts::store::PgReceiptStore;
use crate::kernel::{FsBlobStore, HttpRecognitionClient, LogTelemetrySink, ServerDeps};
use crate::server::auth::JwtService;
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::{export_handler, health_handler, list_handler, scan_handler};

/// Uploaded receipt photos top out well under this.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub server_deps: Arc<ServerDeps>,
    pub jwt_service: Arc<JwtService>,
}

/// Build the Axum application router
pub fn build_app(pool: PgPool, config: &Config) -> Result<Router> {
    let recognition = HttpRecognitionClient::new(
        config.recognition_base_url.clone(),
        Duration::from_secs(config.recognition_timeout_secs),
    )?;

    let server_deps = Arc::new(ServerDeps::new(
        Arc::new(recognition),
        Arc::new(FsBlobStore::new(config.blob_root.clone())),
        Arc::new(PgReceiptStore::new(pool.clone())),
        Arc::new(LogTelemetrySink),
    ));

    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()));

    let state = AppState {
        db_pool: pool,
        server_deps,
        jwt_service: jwt_service.clone(),
    };

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/receipts", get(list_handler))
        .route("/api/receipts/scan", post(scan_handler))
        .route("/api/receipts/:id/export", get(export_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn(move |request, next| {
            jwt_auth_middleware(jwt_service.clone(), request, next)
        }))
        .layer(Extension(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
