//! Container-scoped service SAS tokens.
//!
//! - [Create a service SAS](https://learn.microsoft.com/rest/api/storageservices/create-service-sas)
//! - [Create a user delegation SAS](https://learn.microsoft.com/rest/api/storageservices/create-user-delegation-sas)

use super::constants::{ISO8601_SECONDS, STORAGE_API_VERSION};
use crate::domain::{
    image::errors::StorageError,
    storage::credential::{SharedKeyCredential, UserDelegationKey},
};
use chrono::{DateTime, Duration, Utc};

/// Tolerated clock drift between this host and the store.
pub const CLOCK_SKEW_MINUTES: i64 = 5;

/// How long an issued link stays valid.
pub const LINK_LIFETIME_HOURS: i64 = 1;

const SIGNED_RESOURCE_CONTAINER: &str = "c";
const PERMISSION_READ: &str = "r";

/// Validity window of a token issued at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SasWindow {
    pub start: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
}

impl SasWindow {
    pub fn issued_at(now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::minutes(CLOCK_SKEW_MINUTES),
            expiry: now + Duration::hours(LINK_LIFETIME_HOURS),
        }
    }
}

pub fn format_sas_time(time: DateTime<Utc>) -> String {
    time.format(ISO8601_SECONDS).to_string()
}

/// Read-only SAS over a whole container.
pub struct ContainerSas<'a> {
    account: &'a str,
    container: &'a str,
    permissions: &'static str,
    window: SasWindow,
}

impl<'a> ContainerSas<'a> {
    pub fn read_only(account: &'a str, container: &'a str, window: SasWindow) -> Self {
        Self {
            account,
            container,
            permissions: PERMISSION_READ,
            window,
        }
    }

    fn canonicalized_resource(&self) -> String {
        format!("/blob/{}/{}", self.account, self.container)
    }

    fn common_elements(&self) -> Vec<(&'static str, String)> {
        vec![
            ("sv", STORAGE_API_VERSION.to_string()),
            ("st", format_sas_time(self.window.start)),
            ("se", format_sas_time(self.window.expiry)),
            ("sr", SIGNED_RESOURCE_CONTAINER.to_string()),
            ("sp", self.permissions.to_string()),
        ]
    }

    pub fn account_key_string_to_sign(&self) -> String {
        [
            self.permissions.to_string(),
            format_sas_time(self.window.start),
            format_sas_time(self.window.expiry),
            self.canonicalized_resource(),
            String::new(), // signedIdentifier
            String::new(), // signedIP
            String::new(), // signedProtocol
            STORAGE_API_VERSION.to_string(),
            SIGNED_RESOURCE_CONTAINER.to_string(),
            String::new(), // signedSnapshotTime
            String::new(), // signedEncryptionScope
            String::new(), // rscc
            String::new(), // rscd
            String::new(), // rsce
            String::new(), // rscl
            String::new(), // rsct
        ]
        .join("\n")
    }

    pub fn delegation_string_to_sign(&self, key: &UserDelegationKey) -> String {
        [
            self.permissions.to_string(),
            format_sas_time(self.window.start),
            format_sas_time(self.window.expiry),
            self.canonicalized_resource(),
            key.signed_oid.clone(),
            key.signed_tid.clone(),
            key.signed_start.clone(),
            key.signed_expiry.clone(),
            key.signed_service.clone(),
            key.signed_version.clone(),
            String::new(), // signedAuthorizedUserObjectId
            String::new(), // signedUnauthorizedUserObjectId
            String::new(), // signedCorrelationId
            String::new(), // signedIP
            String::new(), // signedProtocol
            STORAGE_API_VERSION.to_string(),
            SIGNED_RESOURCE_CONTAINER.to_string(),
            String::new(), // signedSnapshotTime
            String::new(), // signedEncryptionScope
            String::new(), // rscc
            String::new(), // rscd
            String::new(), // rsce
            String::new(), // rscl
            String::new(), // rsct
        ]
        .join("\n")
    }

    /// Query string signed with the shared account key.
    pub fn sign_with_account_key(&self, key: &SharedKeyCredential) -> Result<String, StorageError> {
        let signature = key.sign(&self.account_key_string_to_sign())?;
        let mut elements = self.common_elements();
        elements.push(("sig", signature));
        Ok(encode(elements))
    }

    /// Query string signed with a user delegation key.
    pub fn sign_with_delegation_key(&self, key: &UserDelegationKey) -> Result<String, StorageError> {
        let signature = key.sign(&self.delegation_string_to_sign(key))?;
        let mut elements = self.common_elements();
        elements.extend([
            ("skoid", key.signed_oid.clone()),
            ("sktid", key.signed_tid.clone()),
            ("skt", key.signed_start.clone()),
            ("ske", key.signed_expiry.clone()),
            ("sks", key.signed_service.clone()),
            ("skv", key.signed_version.clone()),
            ("sig", signature),
        ]);
        Ok(encode(elements))
    }
}

fn encode(elements: Vec<(&'static str, String)>) -> String {
    elements
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, urlencoded(&v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn urlencoded(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
