use crate::presentation::http::state::AppState;
use axum::{Json, extract::State};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    thumbnails_enabled: bool,
    link_mode: String,
}

/// Liveness only; storage is not contacted.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        thumbnails_enabled: state.config.storage.thumbnails_enabled(),
        link_mode: state.config.link_mode.to_string(),
    })
}
