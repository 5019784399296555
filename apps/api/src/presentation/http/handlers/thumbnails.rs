use crate::{
    application::list_thumbnails::dto::render_links,
    presentation::http::{errors::AppError, state::AppState},
};
use axum::{Json, extract::State};

pub async fn list_thumbnails(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let entries = state
        .list_thumbnails
        .execute(&state.config.storage, state.config.link_mode)
        .await?;
    Ok(Json(render_links(&entries)))
}
