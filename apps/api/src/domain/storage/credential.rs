use super::super::image::errors::StorageError;
use base64::{Engine, prelude::BASE64_STANDARD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Base64 encoded HMAC-SHA256 of `content` under `key`.
pub fn base64_hmac_sha256(key: &[u8], content: &[u8]) -> Result<String, StorageError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| StorageError::Signing(format!("HMAC error: {}", e)))?;
    mac.update(content);
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

/// Bearer token handed out by the platform identity endpoint.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_on: None,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Account name plus the decoded shared account key.
#[derive(Clone)]
pub struct SharedKeyCredential {
    account_name: String,
    key: Vec<u8>,
}

impl SharedKeyCredential {
    /// Fails when the key is not valid base64, which the store always issues.
    pub fn new(account_name: impl Into<String>, account_key: &str) -> Result<Self, StorageError> {
        let key = BASE64_STANDARD
            .decode(account_key.trim())
            .map_err(|e| StorageError::Signing(format!("account key is not valid base64: {}", e)))?;
        if key.is_empty() {
            return Err(StorageError::Signing("account key is empty".into()));
        }
        Ok(Self {
            account_name: account_name.into(),
            key,
        })
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn sign(&self, string_to_sign: &str) -> Result<String, StorageError> {
        base64_hmac_sha256(&self.key, string_to_sign.as_bytes())
    }
}

impl fmt::Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyCredential")
            .field("account_name", &self.account_name)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// The single credential active for one operation.
#[derive(Debug, Clone)]
pub enum Credential {
    Identity(AccessToken),
    SharedKey(SharedKeyCredential),
}

impl Credential {
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Identity(_) => "managed-identity",
            Self::SharedKey(_) => "shared-key",
        }
    }
}

/// Short-lived signing key issued to an identity-authenticated caller.
#[derive(Clone)]
pub struct UserDelegationKey {
    pub signed_oid: String,
    pub signed_tid: String,
    pub signed_start: String,
    pub signed_expiry: String,
    pub signed_service: String,
    pub signed_version: String,
    pub value: String,
}

impl UserDelegationKey {
    pub fn sign(&self, string_to_sign: &str) -> Result<String, StorageError> {
        let key = BASE64_STANDARD
            .decode(&self.value)
            .map_err(|e| StorageError::Signing(format!("delegation key is not valid base64: {}", e)))?;
        base64_hmac_sha256(&key, string_to_sign.as_bytes())
    }
}

impl fmt::Debug for UserDelegationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserDelegationKey")
            .field("signed_oid", &self.signed_oid)
            .field("signed_tid", &self.signed_tid)
            .field("signed_start", &self.signed_start)
            .field("signed_expiry", &self.signed_expiry)
            .field("signed_service", &self.signed_service)
            .field("signed_version", &self.signed_version)
            .field("value", &"<redacted>")
            .finish()
    }
}
