//! Identity-first credential resolution.
//!
//! The ambient identity is tried first and proven usable with a container
//! properties probe. Only when that fails is the shared account key used.

use super::traits::TokenSource;
use crate::{
    domain::{
        image::errors::PipelineError,
        storage::{
            config::StorageConfig,
            credential::{AccessToken, Credential, SharedKeyCredential},
        },
    },
    infrastructure::storage::{constants::STORAGE_RESOURCE, traits::BlobService},
};
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Outcome of one resolution attempt.
#[derive(Debug)]
pub enum Resolution {
    /// The token worked; `container_exists` is the probe's answer.
    Identity {
        token: AccessToken,
        container_exists: bool,
    },
    Key(SharedKeyCredential),
    Failure { identity: String, key: String },
}

/// A usable credential plus whatever resolution already learned about the
/// probed container.
#[derive(Debug)]
pub struct ResolvedCredential {
    pub credential: Credential,
    /// Set only when the identity probe ran against the container.
    pub container_exists: Option<bool>,
}

pub struct CredentialResolver {
    token_source: Arc<dyn TokenSource>,
    store: Arc<dyn BlobService>,
    deadline: Duration,
}

impl CredentialResolver {
    pub fn new(
        token_source: Arc<dyn TokenSource>,
        store: Arc<dyn BlobService>,
        deadline: Duration,
    ) -> Self {
        Self {
            token_source,
            store,
            deadline,
        }
    }

    /// Runs the identity-then-key policy without raising.
    pub async fn try_resolve(&self, config: &StorageConfig, probe_container: &str) -> Resolution {
        let identity_failure = match self.usable_identity(probe_container).await {
            Ok((token, container_exists)) => {
                debug!(container = probe_container, "Using managed identity for storage access");
                return Resolution::Identity {
                    token,
                    container_exists,
                };
            }
            Err(reason) => reason,
        };

        let Some(key) = config.usable_account_key() else {
            return Resolution::Failure {
                identity: identity_failure,
                key: "no account key configured".into(),
            };
        };

        warn!(
            reason = %identity_failure,
            "Managed identity unusable, falling back to shared account key"
        );
        match SharedKeyCredential::new(config.account_name.clone(), key) {
            Ok(credential) => Resolution::Key(credential),
            Err(err) => Resolution::Failure {
                identity: identity_failure,
                key: err.to_string(),
            },
        }
    }

    pub async fn resolve(
        &self,
        config: &StorageConfig,
        probe_container: &str,
    ) -> Result<Credential, PipelineError> {
        Ok(self.resolve_probed(config, probe_container).await?.credential)
    }

    /// Like [`resolve`](Self::resolve), keeping the probe's answer so callers
    /// need not ask the store again.
    pub async fn resolve_probed(
        &self,
        config: &StorageConfig,
        probe_container: &str,
    ) -> Result<ResolvedCredential, PipelineError> {
        match self.try_resolve(config, probe_container).await {
            Resolution::Identity {
                token,
                container_exists,
            } => Ok(ResolvedCredential {
                credential: Credential::Identity(token),
                container_exists: Some(container_exists),
            }),
            Resolution::Key(key) => {
                info!(account = %config.account_name, "Using shared key for storage access");
                Ok(ResolvedCredential {
                    credential: Credential::SharedKey(key),
                    container_exists: None,
                })
            }
            Resolution::Failure { identity, key } => {
                error!(identity = %identity, key = %key, "No storage credential available");
                Err(PipelineError::NoAuthAvailable)
            }
        }
    }

    async fn usable_identity(&self, probe_container: &str) -> Result<(AccessToken, bool), String> {
        let token = timeout(self.deadline, self.token_source.get_token(STORAGE_RESOURCE))
            .await
            .map_err(|_| "identity endpoint timed out".to_string())?
            .map_err(|e| format!("identity unavailable: {}", e))?;

        let credential = Credential::Identity(token.clone());
        let container = self.store.container(probe_container, &credential);
        let exists = timeout(self.deadline, container.exists())
            .await
            .map_err(|_| "identity probe timed out".to_string())?
            .map_err(|e| format!("identity probe failed: {}", e))?;

        Ok((token, exists))
    }
}
