use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use futures_util::{StreamExt, stream};
use image_gallery::{
    application::{
        list_thumbnails::use_case::ListThumbnailsUseCase,
        upload_image::use_case::UploadImageUseCase,
    },
    config::Config,
    domain::{
        image::{errors::StorageError, value_objects::BlobName},
        storage::credential::{AccessToken, Credential, UserDelegationKey},
    },
    infrastructure::{
        clock::Clock,
        identity::{credential_resolver::CredentialResolver, traits::TokenSource},
        imaging::image_thumbnailer::ImageThumbnailer,
        storage::traits::{BlobContainer, BlobNameStream, BlobService},
    },
    presentation::http::{routes::create_router, state::AppState},
};
use serde::de::DeserializeOwned;
use std::{
    collections::{BTreeMap, HashMap},
    io::Cursor,
    sync::{Arc, Mutex},
    time::Duration,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const ACCOUNT: &str = "galleryacct";
pub const IMAGES: &str = "images";
pub const THUMBNAILS: &str = "thumbnails";
/// base64("gallery-test-key")
pub const ACCOUNT_KEY: &str = "Z2FsbGVyeS10ZXN0LWtleQ==";

/// Every call the pipeline made against the store, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Exists { container: String, credential: &'static str },
    Create { container: String, credential: &'static str },
    Upload { container: String, blob: String, content_type: String },
    List { container: String },
    DelegationKey,
}

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub data: Bytes,
    pub content_type: String,
}

#[derive(Default)]
struct StoreState {
    containers: BTreeMap<String, BTreeMap<String, StoredBlob>>,
    ops: Vec<StoreOp>,
}

/// In-memory blob store that records every operation.
///
/// Requests made with an identity credential fail with 403 when
/// `reject_identity` is set, mimicking a token without data-plane rights.
#[derive(Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
    reject_identity: bool,
}

impl InMemoryStore {
    pub fn rejecting_identity() -> Self {
        Self {
            reject_identity: true,
            ..Default::default()
        }
    }

    pub fn ops(&self) -> Vec<StoreOp> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn uploads(&self) -> Vec<StoreOp> {
        self.ops()
            .into_iter()
            .filter(|op| matches!(op, StoreOp::Upload { .. }))
            .collect()
    }

    pub fn blob(&self, container: &str, name: &str) -> Option<StoredBlob> {
        self.state
            .lock()
            .unwrap()
            .containers
            .get(container)
            .and_then(|blobs| blobs.get(name))
            .cloned()
    }

    /// Seeds a blob without recording an operation.
    pub fn seed(&self, container: &str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .containers
            .entry(container.to_string())
            .or_default()
            .insert(
                name.to_string(),
                StoredBlob {
                    data: Bytes::from_static(b"seeded"),
                    content_type: "image/png".into(),
                },
            );
    }

    pub fn create_empty(&self, container: &str) {
        self.state
            .lock()
            .unwrap()
            .containers
            .entry(container.to_string())
            .or_default();
    }
}

struct InMemoryContainer {
    name: String,
    credential: &'static str,
    state: Arc<Mutex<StoreState>>,
    rejected: bool,
}

impl InMemoryContainer {
    fn authorize(&self) -> Result<(), StorageError> {
        if self.rejected {
            return Err(StorageError::Http {
                status: 403,
                code: Some("AuthorizationPermissionMismatch".into()),
                message: "This request is not authorized to perform this operation".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BlobContainer for InMemoryContainer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_if_not_exists(&self) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(StoreOp::Create {
            container: self.name.clone(),
            credential: self.credential,
        });
        self.authorize()?;
        state.containers.entry(self.name.clone()).or_default();
        Ok(())
    }

    async fn exists(&self) -> Result<bool, StorageError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(StoreOp::Exists {
            container: self.name.clone(),
            credential: self.credential,
        });
        self.authorize()?;
        Ok(state.containers.contains_key(&self.name))
    }

    async fn upload(
        &self,
        blob_name: &BlobName,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(StoreOp::Upload {
            container: self.name.clone(),
            blob: blob_name.to_string(),
            content_type: content_type.to_string(),
        });
        self.authorize()?;
        let blobs = state.containers.get_mut(&self.name).ok_or(StorageError::Http {
            status: 404,
            code: Some("ContainerNotFound".into()),
            message: "The specified container does not exist.".into(),
        })?;
        blobs.insert(
            blob_name.to_string(),
            StoredBlob {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn list_blobs(&self) -> BlobNameStream {
        let mut state = self.state.lock().unwrap();
        state.ops.push(StoreOp::List {
            container: self.name.clone(),
        });
        let names: Vec<String> = state
            .containers
            .get(&self.name)
            .map(|blobs| blobs.keys().cloned().collect())
            .unwrap_or_default();
        stream::iter(names.into_iter().map(Ok)).boxed()
    }

    fn blob_url(&self, blob_name: &str) -> String {
        format!("https://{}.blob.core.windows.net/{}/{}", ACCOUNT, self.name, blob_name)
    }
}

#[async_trait]
impl BlobService for InMemoryStore {
    fn account_name(&self) -> &str {
        ACCOUNT
    }

    fn container(&self, name: &str, credential: &Credential) -> Box<dyn BlobContainer> {
        Box::new(InMemoryContainer {
            name: name.to_string(),
            credential: credential.kind(),
            state: self.state.clone(),
            rejected: self.reject_identity && credential.is_identity(),
        })
    }

    async fn user_delegation_key(
        &self,
        credential: &Credential,
        start: DateTime<Utc>,
        expiry: DateTime<Utc>,
    ) -> Result<UserDelegationKey, StorageError> {
        self.state.lock().unwrap().ops.push(StoreOp::DelegationKey);
        if !credential.is_identity() {
            return Err(StorageError::Signing("identity required".into()));
        }
        Ok(UserDelegationKey {
            signed_oid: "11111111-1111-1111-1111-111111111111".into(),
            signed_tid: "22222222-2222-2222-2222-222222222222".into(),
            signed_start: start.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            signed_expiry: expiry.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            signed_service: "b".into(),
            signed_version: "2021-08-06".into(),
            value: ACCOUNT_KEY.into(),
        })
    }
}

/// Identity endpoint double: hands out a token or fails.
pub struct StaticTokenSource {
    available: bool,
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn get_token(&self, _resource: &str) -> anyhow::Result<AccessToken> {
        if self.available {
            Ok(AccessToken::new("test-identity-token"))
        } else {
            Err(anyhow::anyhow!("no managed identity endpoint"))
        }
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn issued_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub struct TestApp {
    pub app: Router,
    pub store: Arc<InMemoryStore>,
}

/// Knobs for one test application.
pub struct AppOptions {
    pub identity: bool,
    pub account_key: Option<&'static str>,
    pub thumbnails: bool,
    pub link_mode: &'static str,
    pub store: InMemoryStore,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            identity: false,
            account_key: Some(ACCOUNT_KEY),
            thumbnails: true,
            link_mode: "signed",
            store: InMemoryStore::default(),
        }
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(AppOptions::default())
}

pub fn spawn_app_with(options: AppOptions) -> TestApp {
    let mut vars = HashMap::from([
        ("AZURE_STORAGE_ACCOUNT_NAME", ACCOUNT.to_string()),
        ("AZURE_STORAGE_IMAGE_CONTAINER", IMAGES.to_string()),
        ("THUMBNAIL_LINK_MODE", options.link_mode.to_string()),
        ("STATIC_DIR", "./does-not-exist".to_string()),
    ]);
    if let Some(key) = options.account_key {
        vars.insert("AZURE_STORAGE_ACCOUNT_KEY", key.to_string());
    }
    if options.thumbnails {
        vars.insert("AZURE_STORAGE_THUMBNAIL_CONTAINER", THUMBNAILS.to_string());
    }
    let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("invalid test config");

    let store = Arc::new(options.store);
    let blob_service: Arc<dyn BlobService> = store.clone();
    let resolver = Arc::new(CredentialResolver::new(
        Arc::new(StaticTokenSource {
            available: options.identity,
        }),
        blob_service.clone(),
        Duration::from_secs(5),
    ));

    let state = AppState {
        config: config.clone(),
        upload_images: Arc::new(UploadImageUseCase::new(
            resolver.clone(),
            blob_service.clone(),
            Arc::new(ImageThumbnailer::new(config.thumbnail_format)),
            Duration::from_secs(5),
        )),
        list_thumbnails: Arc::new(ListThumbnailsUseCase::new(
            resolver,
            blob_service,
            Arc::new(FixedClock(issued_at())),
            Duration::from_secs(5),
        )),
    };

    TestApp {
        app: create_router(state),
        store,
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(req).await.expect("request failed")
}

pub async fn read_json<T: DeserializeOwned>(res: axum::response::Response) -> T {
    let bytes = to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("failed to parse json")
}

pub async fn read_text(res: axum::response::Response) -> String {
    let bytes = to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    String::from_utf8(bytes.to_vec()).expect("invalid utf8")
}

pub async fn expect_status(
    res: axum::response::Response,
    expected: StatusCode,
) -> axum::response::Response {
    let actual = res.status();

    if actual == expected {
        return res;
    }

    let body = read_text(res).await;
    panic!(
        "HTTP status mismatch. Expected {}, got {}. Response body: {}",
        expected, actual, body
    );
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let uuid_bytes = *Uuid::now_v7().as_bytes();
    let image = image::RgbaImage::from_fn(width, height, |x, y| {
        let i = ((x + y) % 16) as usize;
        image::Rgba([uuid_bytes[i], uuid_bytes[(i + 5) % 16], 90, 255])
    });
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("failed to encode png");
    bytes
}

/// One file part of a multipart upload.
pub struct FilePart<'a> {
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

pub fn multipart_body(files: &[FilePart<'_>]) -> (String, Vec<u8>) {
    let boundary = format!("----gallery-boundary-{}", Uuid::now_v7());
    let mut body = Vec::new();

    for file in files {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n",
                file.file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", file.content_type).as_bytes());
        body.extend_from_slice(file.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    (boundary, body)
}

pub fn upload_request(files: &[FilePart<'_>]) -> Request<Body> {
    let (boundary, body) = multipart_body(files);
    Request::builder()
        .method("POST")
        .uri("/api/images/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .expect("failed to build upload request")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}
