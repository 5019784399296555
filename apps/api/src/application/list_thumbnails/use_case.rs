use crate::{
    application::deadline::with_deadline,
    domain::{
        image::{errors::PipelineError, value_objects::ThumbnailUrlEntry},
        storage::{
            config::{LinkMode, StorageConfig},
            credential::Credential,
        },
    },
    infrastructure::{
        clock::Clock,
        identity::credential_resolver::CredentialResolver,
        storage::{
            sas::{ContainerSas, SasWindow},
            traits::BlobService,
        },
    },
};
use futures_util::TryStreamExt;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, instrument};

/// Lists thumbnail links, signed or plain.
///
/// A missing thumbnail container, configured or physical, yields an empty list.
pub struct ListThumbnailsUseCase {
    resolver: Arc<CredentialResolver>,
    store: Arc<dyn BlobService>,
    clock: Arc<dyn Clock>,
    deadline: Duration,
}

impl ListThumbnailsUseCase {
    pub fn new(
        resolver: Arc<CredentialResolver>,
        store: Arc<dyn BlobService>,
        clock: Arc<dyn Clock>,
        deadline: Duration,
    ) -> Self {
        Self {
            resolver,
            store,
            clock,
            deadline,
        }
    }

    #[instrument(skip(self, config, link_mode), fields(link_mode = %link_mode))]
    pub async fn execute(
        &self,
        config: &StorageConfig,
        link_mode: LinkMode,
    ) -> Result<Vec<ThumbnailUrlEntry>, PipelineError> {
        let Some(container_name) = config.thumbnail_container.as_deref() else {
            debug!("Thumbnails disabled, nothing to list");
            return Ok(Vec::new());
        };

        let resolved = self.resolver.resolve_probed(config, container_name).await?;
        let credential = resolved.credential;
        let container = self.store.container(container_name, &credential);
        let exists = match resolved.container_exists {
            Some(exists) => exists,
            None => with_deadline(self.deadline, "check container", container.exists()).await?,
        };
        if !exists {
            debug!(container = container_name, "Thumbnail container does not exist yet");
            return Ok(Vec::new());
        }

        let signed_query = match link_mode {
            LinkMode::Plain => None,
            LinkMode::Signed => Some(self.sign_container(container_name, &credential).await?),
        };

        let mut entries = Vec::new();
        let mut names = container.list_blobs();
        while let Some(name) = with_deadline(self.deadline, "list blobs", names.try_next()).await? {
            let url = container.blob_url(&name);
            entries.push(match &signed_query {
                Some(query) => ThumbnailUrlEntry::signed(url, query.clone()),
                None => ThumbnailUrlEntry::plain(url),
            });
        }

        info!(container = container_name, count = entries.len(), "Listed thumbnails");
        Ok(entries)
    }

    /// One container-scoped read token covers every blob in the listing.
    async fn sign_container(
        &self,
        container_name: &str,
        credential: &Credential,
    ) -> Result<String, PipelineError> {
        let window = SasWindow::issued_at(self.clock.now());
        let sas = ContainerSas::read_only(self.store.account_name(), container_name, window);

        match credential {
            Credential::SharedKey(key) => Ok(sas.sign_with_account_key(key)?),
            Credential::Identity(_) => {
                let delegation_key = with_deadline(
                    self.deadline,
                    "get user delegation key",
                    self.store
                        .user_delegation_key(credential, window.start, window.expiry),
                )
                .await?;
                Ok(sas.sign_with_delegation_key(&delegation_key)?)
            }
        }
    }
}
