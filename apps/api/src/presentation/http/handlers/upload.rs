use crate::{
    application::upload_image::dto::{UploadImageRequest, UploadImagesResponse},
    presentation::http::{errors::AppError, state::AppState},
};
use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};

/// Accepts one or more files; every multipart part carrying a file name is
/// treated as a file and uploaded in the order received.
pub async fn upload_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadImagesResponse>), AppError> {
    let mut uploaded = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let Some(file_name) = field
            .file_name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
        else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        state
            .upload_images
            .execute(
                UploadImageRequest {
                    file_name: file_name.clone(),
                    content_type,
                    data,
                },
                &state.config.storage,
            )
            .await?;
        uploaded.push(file_name);
    }

    if uploaded.is_empty() {
        return Err(AppError::BadRequest(
            "No files received from the upload".into(),
        ));
    }

    tracing::info!(count = uploaded.len(), "Upload request completed");
    Ok((StatusCode::ACCEPTED, Json(UploadImagesResponse { uploaded })))
}
