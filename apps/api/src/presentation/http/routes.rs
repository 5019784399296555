use super::{
    handlers::{health, thumbnails, upload},
    middleware::{logging::logging_middleware, request_id::request_id_middleware},
    state::AppState,
};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::path::Path;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub fn create_router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();

    let router = Router::new()
        // Health
        .route("/health", get(health::health_check))
        // Images
        .route("/api/images/upload", post(upload::upload_images))
        .route("/api/images/thumbnails", get(thumbnails::list_thumbnails));

    // Front-end
    let router = if Path::new(&static_dir).is_dir() {
        router.fallback_service(ServeDir::new(static_dir))
    } else {
        tracing::warn!(dir = %static_dir, "Static directory not found, front-end disabled");
        router
    };

    router
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
