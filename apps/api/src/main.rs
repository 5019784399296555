use axum::extract::DefaultBodyLimit;
use http::{HeaderValue, Method, header};
use image_gallery::{
    application::{
        list_thumbnails::use_case::ListThumbnailsUseCase,
        upload_image::use_case::UploadImageUseCase,
    },
    config::Config,
    infrastructure::{
        clock::SystemClock,
        identity::{credential_resolver::CredentialResolver, imds_token_source::ImdsTokenSource},
        imaging::image_thumbnailer::ImageThumbnailer,
        storage::{azure_blob_service::AzureBlobService, traits::BlobService},
    },
    presentation::http::{routes::create_router, state::AppState},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Uses RUST_LOG if set, otherwise sensible defaults
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| {
            tracing_subscriber::EnvFilter::try_new("info,image_gallery=debug,tower_http=debug")
        })
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Config::from_env()?;
    tracing::debug!(?config, "Configuration loaded");

    let store: Arc<dyn BlobService> = Arc::new(AzureBlobService::new(
        config.storage.account_name.clone(),
        config.blob_endpoint.clone(),
        config.storage_timeout(),
    )?);

    let mut token_source = ImdsTokenSource::new(config.identity_timeout())?;
    if let Some(endpoint) = &config.identity_endpoint {
        token_source = token_source.with_endpoint(endpoint);
    }
    if let Some(secret) = &config.identity_header {
        token_source = token_source.with_identity_header(secret);
    }
    if let Some(client_id) = &config.client_id {
        token_source = token_source.with_client_id(client_id);
    }

    let resolver = Arc::new(CredentialResolver::new(
        Arc::new(token_source),
        store.clone(),
        config.identity_timeout(),
    ));

    let state = AppState {
        config: config.clone(),
        upload_images: Arc::new(UploadImageUseCase::new(
            resolver.clone(),
            store.clone(),
            Arc::new(ImageThumbnailer::new(config.thumbnail_format)),
            config.storage_timeout(),
        )),
        list_thumbnails: Arc::new(ListThumbnailsUseCase::new(
            resolver,
            store,
            Arc::new(SystemClock),
            config.storage_timeout(),
        )),
    };

    // Any origin while developing, configured origins in release builds
    let allowed_origins = if cfg!(debug_assertions) {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .cors_allowed_origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!(%origin, error = %e, "Ignoring invalid CORS origin");
                        None
                    }
                }),
        )
    };
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    #[allow(deprecated)]
    let request_timeout = TimeoutLayer::new(config.request_timeout());

    let app = create_router(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(request_timeout)
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        account = %config.storage.account_name,
        images = %config.storage.image_container,
        thumbnails = ?config.storage.thumbnail_container,
        link_mode = %config.link_mode,
        "Image gallery listening on {}",
        addr
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("SIGTERM received, initiating graceful shutdown");
        }
    }
}
