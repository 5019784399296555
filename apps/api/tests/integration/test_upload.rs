use super::helpers::{
    AppOptions, FilePart, IMAGES, InMemoryStore, StoreOp, THUMBNAILS, expect_status, png_bytes,
    read_json, read_text, send, spawn_app, spawn_app_with, upload_request,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use image::GenericImageView;
use serde_json::Value;

#[tokio::test]
async fn upload_without_file_parts_is_rejected() {
    let app = spawn_app();

    let boundary = "----gallery-boundary-no-file";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"caption\"\r\n\r\nholiday\r\n--{b}--\r\n",
        b = boundary
    );
    let req = Request::builder()
        .method("POST")
        .uri("/api/images/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .expect("failed to build request");

    let res = expect_status(send(&app.app, req).await, StatusCode::BAD_REQUEST).await;
    let text = read_text(res).await;
    assert!(
        text.contains("No files received from the upload"),
        "unexpected body: {text}"
    );
    assert!(app.store.ops().is_empty());
}

#[tokio::test]
async fn non_image_upload_is_unsupported_and_touches_no_storage() {
    let app = spawn_app();

    let req = upload_request(&[FilePart {
        file_name: "notes.txt",
        content_type: "text/plain",
        data: b"shopping list",
    }]);

    let res = expect_status(send(&app.app, req).await, StatusCode::UNSUPPORTED_MEDIA_TYPE).await;
    let body: Value = read_json(res).await;
    assert_eq!(body["error"], "Unsupported media type");
    assert!(app.store.ops().is_empty());
}

#[tokio::test]
async fn empty_file_is_unsupported() {
    let app = spawn_app();

    let req = upload_request(&[FilePart {
        file_name: "empty.png",
        content_type: "image/png",
        data: b"",
    }]);

    expect_status(send(&app.app, req).await, StatusCode::UNSUPPORTED_MEDIA_TYPE).await;
    assert!(app.store.ops().is_empty());
}

#[tokio::test]
async fn relative_path_names_are_unsupported_and_touch_no_storage() {
    let app = spawn_app();
    let data = png_bytes(16, 16);

    let req = upload_request(&[FilePart {
        file_name: "../other/evil.png",
        content_type: "image/png",
        data: &data,
    }]);

    expect_status(send(&app.app, req).await, StatusCode::UNSUPPORTED_MEDIA_TYPE).await;
    assert!(app.store.ops().is_empty());
}

#[tokio::test]
async fn extension_alone_qualifies_an_image() {
    let app = spawn_app_with(AppOptions {
        thumbnails: false,
        ..Default::default()
    });
    let data = png_bytes(8, 8);

    let req = upload_request(&[FilePart {
        file_name: "SCAN.PNG",
        content_type: "application/octet-stream",
        data: &data,
    }]);

    expect_status(send(&app.app, req).await, StatusCode::ACCEPTED).await;
    assert!(app.store.blob(IMAGES, "SCAN.PNG").is_some());
}

#[tokio::test]
async fn upload_without_thumbnail_container_writes_only_the_original() {
    let app = spawn_app_with(AppOptions {
        thumbnails: false,
        ..Default::default()
    });
    let data = png_bytes(320, 200);

    let req = upload_request(&[FilePart {
        file_name: "sunset.png",
        content_type: "image/png",
        data: &data,
    }]);

    let res = expect_status(send(&app.app, req).await, StatusCode::ACCEPTED).await;
    let body: Value = read_json(res).await;
    assert_eq!(body["uploaded"], serde_json::json!(["sunset.png"]));

    assert_eq!(
        app.store.uploads(),
        vec![StoreOp::Upload {
            container: IMAGES.into(),
            blob: "sunset.png".into(),
            content_type: "image/png".into(),
        }]
    );
    assert_eq!(app.store.blob(IMAGES, "sunset.png").unwrap().data.as_ref(), data.as_slice());
}

#[tokio::test]
async fn upload_with_thumbnail_container_writes_both_under_the_same_name() {
    let app = spawn_app();
    let data = png_bytes(400, 200);

    let req = upload_request(&[FilePart {
        file_name: "harbour.png",
        content_type: "image/png",
        data: &data,
    }]);

    expect_status(send(&app.app, req).await, StatusCode::ACCEPTED).await;

    let uploads = app.store.uploads();
    assert_eq!(uploads.len(), 2);
    assert!(matches!(&uploads[0], StoreOp::Upload { container, blob, .. } if container == IMAGES && blob == "harbour.png"));
    assert!(matches!(&uploads[1], StoreOp::Upload { container, blob, .. } if container == THUMBNAILS && blob == "harbour.png"));

    let thumbnail = app.store.blob(THUMBNAILS, "harbour.png").unwrap();
    assert_eq!(thumbnail.content_type, "image/png");
    let decoded = image::load_from_memory(&thumbnail.data).expect("thumbnail must decode");
    assert_eq!(decoded.dimensions(), (100, 50));
}

#[tokio::test]
async fn small_images_keep_their_size_as_thumbnails() {
    let app = spawn_app();
    let data = png_bytes(30, 60);

    let req = upload_request(&[FilePart {
        file_name: "icon.png",
        content_type: "image/png",
        data: &data,
    }]);

    expect_status(send(&app.app, req).await, StatusCode::ACCEPTED).await;
    let thumbnail = app.store.blob(THUMBNAILS, "icon.png").unwrap();
    let decoded = image::load_from_memory(&thumbnail.data).unwrap();
    assert_eq!(decoded.dimensions(), (30, 60));
}

#[tokio::test]
async fn every_file_part_is_uploaded_in_order() {
    let app = spawn_app();
    let first = png_bytes(50, 50);
    let second = png_bytes(120, 240);

    let req = upload_request(&[
        FilePart {
            file_name: "one.png",
            content_type: "image/png",
            data: &first,
        },
        FilePart {
            file_name: "two.png",
            content_type: "image/png",
            data: &second,
        },
    ]);

    let res = expect_status(send(&app.app, req).await, StatusCode::ACCEPTED).await;
    let body: Value = read_json(res).await;
    assert_eq!(body["uploaded"], serde_json::json!(["one.png", "two.png"]));
    assert_eq!(app.store.uploads().len(), 4);
}

#[tokio::test]
async fn reuploading_a_name_overwrites_the_blob() {
    let app = spawn_app_with(AppOptions {
        thumbnails: false,
        ..Default::default()
    });
    let first = png_bytes(10, 10);
    let second = png_bytes(20, 20);

    for data in [&first, &second] {
        let req = upload_request(&[FilePart {
            file_name: "same.png",
            content_type: "image/png",
            data,
        }]);
        expect_status(send(&app.app, req).await, StatusCode::ACCEPTED).await;
    }

    assert_eq!(app.store.blob(IMAGES, "same.png").unwrap().data.as_ref(), second.as_slice());
}

#[tokio::test]
async fn undecodable_image_fails_after_the_original_is_stored() {
    let app = spawn_app();

    let req = upload_request(&[FilePart {
        file_name: "broken.jpg",
        content_type: "image/jpeg",
        data: b"not really a jpeg",
    }]);

    let res = expect_status(send(&app.app, req).await, StatusCode::BAD_REQUEST).await;
    let body: Value = read_json(res).await;
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("Error generating thumbnail for broken.jpg"),
        "unexpected error: {body}"
    );

    assert!(app.store.blob(IMAGES, "broken.jpg").is_some());
    assert!(app.store.blob(THUMBNAILS, "broken.jpg").is_none());
}

#[tokio::test]
async fn identity_is_preferred_over_a_configured_key() {
    let app = spawn_app_with(AppOptions {
        identity: true,
        ..Default::default()
    });
    let data = png_bytes(16, 16);

    let req = upload_request(&[FilePart {
        file_name: "id.png",
        content_type: "image/png",
        data: &data,
    }]);
    expect_status(send(&app.app, req).await, StatusCode::ACCEPTED).await;

    let ops = app.store.ops();
    assert_eq!(
        ops[0],
        StoreOp::Exists {
            container: IMAGES.into(),
            credential: "managed-identity",
        }
    );
    assert!(ops.iter().all(|op| match op {
        StoreOp::Exists { credential, .. } | StoreOp::Create { credential, .. } =>
            *credential == "managed-identity",
        _ => true,
    }));
}

#[tokio::test]
async fn rejected_identity_falls_back_to_the_account_key() {
    let app = spawn_app_with(AppOptions {
        identity: true,
        store: InMemoryStore::rejecting_identity(),
        ..Default::default()
    });
    let data = png_bytes(16, 16);

    let req = upload_request(&[FilePart {
        file_name: "key.png",
        content_type: "image/png",
        data: &data,
    }]);
    expect_status(send(&app.app, req).await, StatusCode::ACCEPTED).await;

    let ops = app.store.ops();
    assert_eq!(
        ops[0],
        StoreOp::Exists {
            container: IMAGES.into(),
            credential: "managed-identity",
        }
    );
    assert_eq!(
        ops[1],
        StoreOp::Create {
            container: IMAGES.into(),
            credential: "shared-key",
        }
    );
    assert!(app.store.blob(THUMBNAILS, "key.png").is_some());
}

#[tokio::test]
async fn no_identity_and_no_key_fails_without_storage_calls() {
    let app = spawn_app_with(AppOptions {
        identity: false,
        account_key: None,
        ..Default::default()
    });
    let data = png_bytes(16, 16);

    let req = upload_request(&[FilePart {
        file_name: "orphan.png",
        content_type: "image/png",
        data: &data,
    }]);

    expect_status(send(&app.app, req).await, StatusCode::INTERNAL_SERVER_ERROR).await;
    assert!(app.store.ops().is_empty());
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = spawn_app();
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let res = expect_status(send(&app.app, req).await, StatusCode::OK).await;
    let id = res
        .headers()
        .get("x-request-id")
        .expect("x-request-id header missing")
        .to_str()
        .unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}
