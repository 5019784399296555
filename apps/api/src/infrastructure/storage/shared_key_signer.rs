//! Request authorization for the blob REST API.
//!
//! Identity credentials travel as a bearer token. Shared keys sign the
//! canonical request as described in
//! [Authorize with Shared Key](https://learn.microsoft.com/rest/api/storageservices/authorize-with-shared-key).

use super::constants::*;
use crate::domain::{
    image::errors::StorageError,
    storage::credential::Credential,
};
use chrono::{DateTime, Utc};
use http::{HeaderValue, header::*};
use reqwest::Request;
use tracing::trace;

/// Stamps date and version headers on `req` and authorizes it with `credential`.
pub fn sign_request(
    req: &mut Request,
    credential: &Credential,
    now: DateTime<Utc>,
) -> Result<(), StorageError> {
    let headers = req.headers_mut();
    headers.insert(X_MS_DATE, header_value(&now.format(HTTP_DATE).to_string())?);
    headers.insert(X_MS_VERSION, HeaderValue::from_static(STORAGE_API_VERSION));

    let authorization = match credential {
        Credential::Identity(token) => format!("Bearer {}", token.token),
        Credential::SharedKey(key) => {
            let string_to_sign = string_to_sign(req, key.account_name())?;
            trace!("string to sign: {:?}", string_to_sign);
            format!("SharedKey {}:{}", key.account_name(), key.sign(&string_to_sign)?)
        }
    };

    let mut value = header_value(&authorization)?;
    value.set_sensitive(true);
    req.headers_mut().insert(AUTHORIZATION, value);
    Ok(())
}

/// Canonical string for Shared Key authorization.
///
/// ```text
/// VERB + "\n" +
/// Content-Encoding + "\n" +
/// Content-Language + "\n" +
/// Content-Length + "\n" +
/// Content-MD5 + "\n" +
/// Content-Type + "\n" +
/// Date + "\n" +
/// If-Modified-Since + "\n" +
/// If-Match + "\n" +
/// If-None-Match + "\n" +
/// If-Unmodified-Since + "\n" +
/// Range + "\n" +
/// CanonicalizedHeaders +
/// CanonicalizedResource;
/// ```
pub fn string_to_sign(req: &Request, account: &str) -> Result<String, StorageError> {
    let headers = req.headers();
    let content_length = match header(headers, CONTENT_LENGTH.as_str()) {
        "0" => "",
        other => other,
    };

    let lines = [
        req.method().as_str(),
        header(headers, CONTENT_ENCODING.as_str()),
        header(headers, CONTENT_LANGUAGE.as_str()),
        content_length,
        header(headers, CONTENT_MD5),
        header(headers, CONTENT_TYPE.as_str()),
        header(headers, DATE.as_str()),
        header(headers, IF_MODIFIED_SINCE.as_str()),
        header(headers, IF_MATCH.as_str()),
        header(headers, IF_NONE_MATCH.as_str()),
        header(headers, IF_UNMODIFIED_SINCE.as_str()),
        header(headers, RANGE.as_str()),
    ];

    let mut s = String::with_capacity(256);
    for line in lines {
        s.push_str(line);
        s.push('\n');
    }
    s.push_str(&canonicalized_headers(req));
    s.push_str(&canonicalized_resource(req, account));
    Ok(s)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn canonicalized_headers(req: &Request) -> String {
    let mut pairs: Vec<(String, String)> = req
        .headers()
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("x-ms-"))
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().trim().to_string(),
            )
        })
        .collect();
    pairs.sort();

    pairs
        .into_iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect()
}

fn canonicalized_resource(req: &Request, account: &str) -> String {
    let url = req.url();
    let mut resource = format!("/{}{}", account, url.path());

    let mut params: Vec<(String, Vec<String>)> = Vec::new();
    for (name, value) in url.query_pairs() {
        let name = name.to_lowercase();
        match params.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, values)) => values.push(value.into_owned()),
            None => params.push((name, vec![value.into_owned()])),
        }
    }
    params.sort_by(|a, b| a.0.cmp(&b.0));

    for (name, mut values) in params {
        values.sort();
        resource.push('\n');
        resource.push_str(&name);
        resource.push(':');
        resource.push_str(&values.join(","));
    }
    resource
}

fn header_value(value: &str) -> Result<HeaderValue, StorageError> {
    HeaderValue::from_str(value).map_err(|e| StorageError::Signing(e.to_string()))
}
