use super::traits::TokenSource;
use crate::domain::storage::credential::AccessToken;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::{HeaderValue, Method};
use reqwest::{Client, Request, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";
const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// Managed identity tokens from the instance metadata service.
///
/// When an identity header is configured the App Service flavour of the
/// protocol is used instead (`IDENTITY_ENDPOINT` + `X-IDENTITY-HEADER`).
#[derive(Clone, Debug)]
pub struct ImdsTokenSource {
    http: Client,
    endpoint: Option<String>,
    identity_header: Option<String>,
    client_id: Option<String>,
}

impl ImdsTokenSource {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            endpoint: None,
            identity_header: None,
            client_id: None,
        })
    }

    /// Endpoint the token is requested from; defaults to the IMDS address.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Secret header value that guards the App Service identity endpoint.
    pub fn with_identity_header(mut self, secret: impl Into<String>) -> Self {
        self.identity_header = Some(secret.into());
        self
    }

    /// Client id of a user-assigned identity.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    fn build_request(&self, resource: &str) -> anyhow::Result<Request> {
        let endpoint = self.endpoint.as_deref().unwrap_or(IMDS_ENDPOINT);
        let api_version = if self.identity_header.is_some() {
            APP_SERVICE_API_VERSION
        } else {
            IMDS_API_VERSION
        };

        let mut query = vec![("api-version", api_version), ("resource", resource)];
        if let Some(client_id) = self.client_id.as_deref() {
            query.push(("client_id", client_id));
        }
        let url = Url::parse_with_params(endpoint, &query)?;

        let mut req = Request::new(Method::GET, url);
        match &self.identity_header {
            Some(secret) => {
                let mut value = HeaderValue::from_str(secret)?;
                value.set_sensitive(true);
                req.headers_mut().insert("x-identity-header", value);
            }
            None => {
                req.headers_mut()
                    .insert("metadata", HeaderValue::from_static("true"));
            }
        }
        Ok(req)
    }
}

#[async_trait]
impl TokenSource for ImdsTokenSource {
    async fn get_token(&self, resource: &str) -> anyhow::Result<AccessToken> {
        let req = self.build_request(resource)?;
        let res = self.http.execute(req).await?;
        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "Failed to get token from identity endpoint: {}",
                status
            ));
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        debug!(expires_on = ?token.expires_at(), "Obtained managed identity token");
        Ok(AccessToken {
            expires_on: token.expires_at(),
            token: token.access_token,
        })
    }
}

// expires_on is unix seconds, sent as a string by IMDS and as a number by some hosts.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_on: Option<serde_json::Value>,
}

impl TokenResponse {
    fn expires_at(&self) -> Option<DateTime<Utc>> {
        let secs = match self.expires_on.as_ref()? {
            serde_json::Value::String(s) => s.parse::<i64>().ok()?,
            serde_json::Value::Number(n) => n.as_i64()?,
            _ => return None,
        };
        DateTime::from_timestamp(secs, 0)
    }
}
