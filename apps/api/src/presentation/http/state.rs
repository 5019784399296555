use crate::{
    application::{
        list_thumbnails::use_case::ListThumbnailsUseCase,
        upload_image::use_case::UploadImageUseCase,
    },
    config::Config,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub upload_images: Arc<UploadImageUseCase>,
    pub list_thumbnails: Arc<ListThumbnailsUseCase>,
}
