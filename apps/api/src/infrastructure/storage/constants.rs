// Headers used by the blob REST API.
pub const X_MS_DATE: &str = "x-ms-date";
pub const X_MS_VERSION: &str = "x-ms-version";
pub const X_MS_BLOB_TYPE: &str = "x-ms-blob-type";
pub const X_MS_ERROR_CODE: &str = "x-ms-error-code";
pub const CONTENT_MD5: &str = "content-md5";

/// Service version sent with every request and stamped into every SAS.
pub const STORAGE_API_VERSION: &str = "2021-08-06";

/// Token audience for managed identity access to blob storage.
pub const STORAGE_RESOURCE: &str = "https://storage.azure.com/";

/// `2022-03-13T07:20:04Z`
pub const ISO8601_SECONDS: &str = "%Y-%m-%dT%H:%M:%SZ";

/// `Sun, 13 Mar 2022 07:20:04 GMT`
pub const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";
