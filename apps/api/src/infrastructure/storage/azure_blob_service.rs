use super::{
    constants::{STORAGE_API_VERSION, X_MS_BLOB_TYPE, X_MS_ERROR_CODE},
    sas::format_sas_time,
    shared_key_signer::sign_request,
    traits::{BlobContainer, BlobNameStream, BlobService},
    xml,
};
use crate::domain::{
    image::{errors::StorageError, value_objects::BlobName},
    storage::credential::{Credential, UserDelegationKey},
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::{StreamExt, TryStreamExt, stream};
use http::{HeaderName, HeaderValue, Method, StatusCode, header};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, Request, Response, Url};
use std::time::Duration;
use tracing::{debug, warn};

/// Characters kept as-is in blob paths. `/` stays so virtual folders survive.
const BLOB_PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

pub fn default_endpoint(account_name: &str) -> String {
    format!("https://{}.blob.core.windows.net", account_name)
}

/// Blob storage reached over its REST API.
///
/// The client performs no retries; every failure surfaces to the caller.
#[derive(Clone)]
pub struct AzureBlobService {
    http: Client,
    endpoint: String,
    account_name: String,
}

impl AzureBlobService {
    pub fn new(
        account_name: String,
        endpoint: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let endpoint = endpoint
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| default_endpoint(&account_name));
        Url::parse(&endpoint)
            .map_err(|e| anyhow::anyhow!("Invalid blob endpoint {}: {}", endpoint, e))?;

        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            account_name,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BlobService for AzureBlobService {
    fn account_name(&self) -> &str {
        &self.account_name
    }

    fn container(&self, name: &str, credential: &Credential) -> Box<dyn BlobContainer> {
        Box::new(AzureContainerClient {
            http: self.http.clone(),
            container_url: format!("{}/{}", self.endpoint, name),
            name: name.to_string(),
            credential: credential.clone(),
        })
    }

    async fn user_delegation_key(
        &self,
        credential: &Credential,
        start: DateTime<Utc>,
        expiry: DateTime<Utc>,
    ) -> Result<UserDelegationKey, StorageError> {
        if !credential.is_identity() {
            return Err(StorageError::Signing(
                "user delegation keys require an identity credential".into(),
            ));
        }

        let mut url = parse_url(&format!("{}/", self.endpoint))?;
        url.query_pairs_mut()
            .append_pair("restype", "service")
            .append_pair("comp", "userdelegationkey");

        let body = xml::key_info_body(&format_sas_time(start), &format_sas_time(expiry))?;
        let mut req = Request::new(Method::POST, url);
        set_header(&mut req, header::CONTENT_TYPE, "application/xml")?;
        set_header(&mut req, header::CONTENT_LENGTH, &body.len().to_string())?;
        *req.body_mut() = Some(body.into());

        let res = send(&self.http, req, credential).await?;
        let res = ensure_success(res).await?;
        let text = res.text().await?;
        debug!(account = %self.account_name, "Obtained user delegation key");
        xml::parse_user_delegation_key(&text)
    }
}

#[derive(Clone)]
pub struct AzureContainerClient {
    http: Client,
    container_url: String,
    name: String,
    credential: Credential,
}

impl AzureContainerClient {
    fn container_request(&self, method: Method, extra: &[(&str, &str)]) -> Result<Request, StorageError> {
        let mut url = parse_url(&self.container_url)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("restype", "container");
            for (k, v) in extra {
                pairs.append_pair(k, v);
            }
        }
        Ok(Request::new(method, url))
    }

    async fn list_page(&self, marker: Option<String>) -> Result<xml::BlobListPage, StorageError> {
        let mut extra = vec![("comp", "list")];
        if let Some(marker) = marker.as_deref() {
            extra.push(("marker", marker));
        }
        let req = self.container_request(Method::GET, &extra)?;
        let res = send(&self.http, req, &self.credential).await?;
        let res = ensure_success(res).await?;
        let text = res.text().await?;
        xml::parse_blob_list(&text)
    }
}

enum ListCursor {
    Start,
    Next(String),
    Done,
}

#[async_trait]
impl BlobContainer for AzureContainerClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_if_not_exists(&self) -> Result<(), StorageError> {
        let mut req = self.container_request(Method::PUT, &[])?;
        set_header(&mut req, header::CONTENT_LENGTH, "0")?;
        let res = send(&self.http, req, &self.credential).await?;

        match res.status() {
            StatusCode::CREATED => {
                debug!(container = %self.name, "Created container");
                Ok(())
            }
            StatusCode::CONFLICT if error_code(&res).as_deref() == Some("ContainerAlreadyExists") => {
                Ok(())
            }
            _ => ensure_success(res).await.map(|_| ()),
        }
    }

    async fn exists(&self) -> Result<bool, StorageError> {
        let req = self.container_request(Method::HEAD, &[])?;
        let res = send(&self.http, req, &self.credential).await?;

        match res.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => ensure_success(res).await.map(|_| false),
        }
    }

    async fn upload(
        &self,
        blob_name: &BlobName,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let size = data.len();
        let url = parse_url(&self.blob_url(blob_name.as_str()))?;
        let mut req = Request::new(Method::PUT, url);
        set_header(&mut req, HeaderName::from_static(X_MS_BLOB_TYPE), "BlockBlob")?;
        set_header(&mut req, header::CONTENT_TYPE, content_type)?;
        set_header(&mut req, header::CONTENT_LENGTH, &size.to_string())?;
        *req.body_mut() = Some(data.into());

        let res = send(&self.http, req, &self.credential).await?;
        ensure_success(res).await?;
        debug!(container = %self.name, blob = %blob_name, size, "Uploaded blob");
        Ok(())
    }

    fn list_blobs(&self) -> BlobNameStream {
        let client = self.clone();
        stream::try_unfold(ListCursor::Start, move |cursor| {
            let client = client.clone();
            async move {
                let marker = match cursor {
                    ListCursor::Done => return Ok::<_, StorageError>(None),
                    ListCursor::Start => None,
                    ListCursor::Next(marker) => Some(marker),
                };
                let page = client.list_page(marker).await?;
                let next = match page.next_marker {
                    Some(marker) => ListCursor::Next(marker),
                    None => ListCursor::Done,
                };
                Ok::<_, StorageError>(Some((page.names, next)))
            }
        })
        .map_ok(|names| stream::iter(names.into_iter().map(Ok::<_, StorageError>)))
        .try_flatten()
        .boxed()
    }

    fn blob_url(&self, blob_name: &str) -> String {
        format!(
            "{}/{}",
            self.container_url,
            utf8_percent_encode(blob_name, BLOB_PATH_ENCODE_SET)
        )
    }
}

async fn send(http: &Client, mut req: Request, credential: &Credential) -> Result<Response, StorageError> {
    sign_request(&mut req, credential, Utc::now())?;
    debug!(
        method = %req.method(),
        path = req.url().path(),
        credential = credential.kind(),
        version = STORAGE_API_VERSION,
        "Storage request"
    );
    Ok(http.execute(req).await?)
}

/// Turns a non-2xx answer into a [`StorageError::Http`].
async fn ensure_success(res: Response) -> Result<Response, StorageError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let header_code = error_code(&res);
    let body = res.text().await.unwrap_or_default();
    let (body_code, body_message) = xml::parse_error(&body);
    let code = header_code.or(body_code);
    let message = body_message.unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    });

    warn!(status = status.as_u16(), code = ?code, "Storage request failed");
    Err(StorageError::Http {
        status: status.as_u16(),
        code,
        message,
    })
}

fn error_code(res: &Response) -> Option<String> {
    res.headers()
        .get(X_MS_ERROR_CODE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn set_header(req: &mut Request, name: HeaderName, value: &str) -> Result<(), StorageError> {
    let value = HeaderValue::from_str(value)
        .map_err(|e| StorageError::Signing(format!("invalid {} header: {}", name.as_str(), e)))?;
    req.headers_mut().insert(name, value);
    Ok(())
}

fn parse_url(raw: &str) -> Result<Url, StorageError> {
    Url::parse(raw).map_err(|e| StorageError::Signing(format!("invalid url {}: {}", raw, e)))
}
