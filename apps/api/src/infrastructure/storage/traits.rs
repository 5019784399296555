use crate::domain::{
    image::{errors::StorageError, value_objects::BlobName},
    storage::credential::{Credential, UserDelegationKey},
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;

/// Lazily enumerated blob names; one full pass per call.
pub type BlobNameStream = BoxStream<'static, Result<String, StorageError>>;

/// Handle on one container, bound to the credential it was opened with.
#[async_trait]
pub trait BlobContainer: Send + Sync {
    fn name(&self) -> &str;

    /// Creates the container unless it already exists.
    async fn create_if_not_exists(&self) -> Result<(), StorageError>;

    async fn exists(&self) -> Result<bool, StorageError>;

    /// Writes `data` under `blob_name`, replacing any existing blob.
    async fn upload(
        &self,
        blob_name: &BlobName,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError>;

    fn list_blobs(&self) -> BlobNameStream;

    fn blob_url(&self, blob_name: &str) -> String;
}

#[async_trait]
pub trait BlobService: Send + Sync {
    fn account_name(&self) -> &str;

    fn container(&self, name: &str, credential: &Credential) -> Box<dyn BlobContainer>;

    /// Only identity credentials can ask for a delegation key.
    async fn user_delegation_key(
        &self,
        credential: &Credential,
        start: DateTime<Utc>,
        expiry: DateTime<Utc>,
    ) -> Result<UserDelegationKey, StorageError>;
}
