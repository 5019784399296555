//! XML bodies exchanged with the blob REST API.

use crate::domain::{image::errors::StorageError, storage::credential::UserDelegationKey};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnumerationResults {
    #[serde(default)]
    blobs: Blobs,
    #[serde(default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Blobs {
    #[serde(rename = "Blob", default)]
    blob: Vec<BlobItem>,
}

#[derive(Debug, Deserialize)]
struct BlobItem {
    #[serde(rename = "Name")]
    name: String,
}

/// One page of a List Blobs response.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BlobListPage {
    pub names: Vec<String>,
    pub next_marker: Option<String>,
}

pub fn parse_blob_list(body: &str) -> Result<BlobListPage, StorageError> {
    let results: EnumerationResults = quick_xml::de::from_str(body)
        .map_err(|e| StorageError::Decode(format!("invalid blob listing: {}", e)))?;

    Ok(BlobListPage {
        names: results.blobs.blob.into_iter().map(|b| b.name).collect(),
        next_marker: results
            .next_marker
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty()),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename = "KeyInfo", rename_all = "PascalCase")]
struct KeyInfo<'a> {
    start: &'a str,
    expiry: &'a str,
}

pub fn key_info_body(start: &str, expiry: &str) -> Result<String, StorageError> {
    let body = quick_xml::se::to_string(&KeyInfo { start, expiry })
        .map_err(|e| StorageError::Decode(format!("failed to encode key request: {}", e)))?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>{}", body))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DelegationKeyBody {
    signed_oid: String,
    signed_tid: String,
    signed_start: String,
    signed_expiry: String,
    signed_service: String,
    signed_version: String,
    value: String,
}

pub fn parse_user_delegation_key(body: &str) -> Result<UserDelegationKey, StorageError> {
    let key: DelegationKeyBody = quick_xml::de::from_str(body)
        .map_err(|e| StorageError::Decode(format!("invalid user delegation key: {}", e)))?;

    Ok(UserDelegationKey {
        signed_oid: key.signed_oid,
        signed_tid: key.signed_tid,
        signed_start: key.signed_start,
        signed_expiry: key.signed_expiry,
        signed_service: key.signed_service,
        signed_version: key.signed_version,
        value: key.value,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Code and message from an error body, when the body is the usual XML.
pub fn parse_error(body: &str) -> (Option<String>, Option<String>) {
    match quick_xml::de::from_str::<ErrorBody>(body) {
        Ok(err) => (
            err.code,
            err.message.map(|m| m.lines().next().unwrap_or_default().to_string()),
        ),
        Err(_) => (None, None),
    }
}
