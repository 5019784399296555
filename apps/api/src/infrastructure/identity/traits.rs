use crate::domain::storage::credential::AccessToken;
use async_trait::async_trait;

/// Source of ambient identity tokens, e.g. a managed identity endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Fetch a token for the given audience.
    async fn get_token(&self, resource: &str) -> anyhow::Result<AccessToken>;
}
