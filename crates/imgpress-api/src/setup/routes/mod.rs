//! Route configuration and setup.

mod health;

use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Router {
    let config = &state.config;
    let body_limit = config.max_request_body_bytes();

    tracing::info!(
        body_limit_bytes = body_limit,
        results_prefix = %config.public_path_prefix,
        public_dir = %config.public_dir.display(),
        "Registering routes"
    );

    let results_files = ServeDir::new(state.results.root());
    let public_files = ServeDir::new(&config.public_dir);

    Router::new()
        .route("/api/health", get(health::health_check))
        .route("/upload", post(handlers::upload::upload_images))
        .route("/download-all", get(handlers::download_all::download_all))
        .nest_service(&config.public_path_prefix, results_files)
        .fallback_service(public_files)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(body_limit)),
        )
        .with_state(state)
}
