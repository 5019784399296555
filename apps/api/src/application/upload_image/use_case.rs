use crate::{
    application::{deadline::with_deadline, upload_image::dto::UploadImageRequest},
    domain::{
        image::{errors::PipelineError, upload_policy::is_image, value_objects::BlobName},
        storage::config::StorageConfig,
    },
    infrastructure::{
        identity::credential_resolver::CredentialResolver,
        imaging::traits::ThumbnailGenerator,
        storage::traits::{BlobContainer, BlobService},
    },
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, instrument};

/// Stores an uploaded original and, when a thumbnail container is
/// configured, a bounded thumbnail under the same name.
///
/// Every step is a precondition for the next; the first failure aborts the
/// rest and nothing already written is rolled back. Blob names are used as
/// given, so uploading the same name twice overwrites.
pub struct UploadImageUseCase {
    resolver: Arc<CredentialResolver>,
    store: Arc<dyn BlobService>,
    thumbnailer: Arc<dyn ThumbnailGenerator>,
    deadline: Duration,
}

impl UploadImageUseCase {
    pub fn new(
        resolver: Arc<CredentialResolver>,
        store: Arc<dyn BlobService>,
        thumbnailer: Arc<dyn ThumbnailGenerator>,
        deadline: Duration,
    ) -> Self {
        Self {
            resolver,
            store,
            thumbnailer,
            deadline,
        }
    }

    #[instrument(skip(self, request, config), fields(
        file_name = %request.file_name,
        content_type = ?request.content_type,
        size = request.data.len()
    ))]
    pub async fn execute(
        &self,
        request: UploadImageRequest,
        config: &StorageConfig,
    ) -> Result<bool, PipelineError> {
        if request.data.is_empty() {
            return Err(PipelineError::Validation(format!(
                "{} is empty",
                request.file_name
            )));
        }
        if !is_image(request.content_type.as_deref(), &request.file_name) {
            return Err(PipelineError::Validation(format!(
                "{} is not an image",
                request.file_name
            )));
        }
        let blob_name = BlobName::new(request.file_name.clone())?;

        let credential = self
            .resolver
            .resolve(config, &config.image_container)
            .await?;

        let images = self.store.container(&config.image_container, &credential);
        self.ensure_container(images.as_ref()).await?;

        let content_type = request
            .content_type
            .as_deref()
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or("application/octet-stream");
        with_deadline(
            self.deadline,
            "upload image",
            images.upload(&blob_name, request.data.clone(), content_type),
        )
        .await?;
        info!(container = images.name(), blob = %blob_name, "Stored original image");

        let Some(thumbnail_container) = config.thumbnail_container.as_deref() else {
            debug!("No thumbnail container configured, skipping thumbnail");
            return Ok(true);
        };

        let thumbnail = with_deadline(
            self.deadline,
            "generate thumbnail",
            self.thumbnailer.generate(request.data, blob_name.as_str()),
        )
        .await?;

        let thumbnails = self.store.container(thumbnail_container, &credential);
        self.ensure_container(thumbnails.as_ref()).await?;
        with_deadline(
            self.deadline,
            "upload thumbnail",
            thumbnails.upload(&blob_name, thumbnail.bytes, thumbnail.content_type),
        )
        .await?;
        info!(
            container = thumbnails.name(),
            blob = %blob_name,
            width = thumbnail.width,
            height = thumbnail.height,
            "Stored thumbnail"
        );

        Ok(true)
    }

    async fn ensure_container(&self, container: &dyn BlobContainer) -> Result<(), PipelineError> {
        with_deadline(
            self.deadline,
            "create container",
            container.create_if_not_exists(),
        )
        .await
    }
}
