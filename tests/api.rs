use axum::{Router, body::Body};
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use image_collector::build_router;
use image_collector::config::{AppConfig, DEFAULT_MAX_BODY_BYTES, StorageType};
use image_collector::errors::StartupError;
use image_collector::storage::LocalFileStorage;

const HELLO_DATA_URL: &str = "data:image/png;base64,aGVsbG8=";

fn local_app() -> (TempDir, Router) {
    let temp = tempfile::tempdir().expect("tempdir");
    let storage =
        LocalFileStorage::new(temp.path().join("saved_images")).expect("local storage");
    (temp, build_router(Arc::new(storage), DEFAULT_MAX_BODY_BYTES))
}

fn storage_dir(temp: &TempDir) -> std::path::PathBuf {
    temp.path().join("saved_images")
}

fn entry_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).expect("read storage dir").count()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, http::HeaderMap, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.expect("call app");
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes()
        .to_vec();
    (status, headers, body)
}

fn save_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/save-image")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

async fn save(app: &Router, class_name: &str) -> Value {
    let (status, _, body) = send(
        app,
        save_request(json!({ "image": HELLO_DATA_URL, "className": class_name })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).expect("json body")
}

async fn list(app: &Router) -> Vec<String> {
    let (status, _, body) = send(app, get_request("/get-images")).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).expect("json body");
    let mut images: Vec<String> = value["images"]
        .as_array()
        .expect("images array")
        .iter()
        .map(|v| v.as_str().expect("string entry").to_string())
        .collect();
    images.sort();
    images
}

#[tokio::test]
async fn listing_empty_directory_returns_empty_array() {
    let (_temp, app) = local_app();
    let (status, _, body) = send(&app, get_request("/get-images")).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).expect("json body");
    assert_eq!(value, json!({ "images": [] }));
}

#[tokio::test]
async fn upload_then_list_shows_new_file() {
    let (temp, app) = local_app();

    let saved = save(&app, "cat").await;
    assert_eq!(saved, json!({ "success": true, "file_name": "cat_1.png" }));

    assert_eq!(list(&app).await, vec!["cat_1.png"]);
    let on_disk = std::fs::read(storage_dir(&temp).join("cat_1.png")).expect("saved file");
    assert_eq!(on_disk, b"hello");
}

#[tokio::test]
async fn sequential_uploads_are_numbered_in_order() {
    let (_temp, app) = local_app();

    for expected in ["cat_1.png", "cat_2.png", "cat_3.png"] {
        assert_eq!(save(&app, "cat").await["file_name"], expected);
    }
}

#[tokio::test]
async fn prefix_matching_counts_longer_class_names() {
    let (_temp, app) = local_app();

    assert_eq!(save(&app, "cat").await["file_name"], "cat_1.png");
    // "cat_1.png" does not start with "cats", but "cats_1.png" starts with
    // "cat", so the next "cat" upload skips to 3.
    assert_eq!(save(&app, "cats").await["file_name"], "cats_1.png");
    assert_eq!(save(&app, "cat").await["file_name"], "cat_3.png");
}

#[tokio::test]
async fn malformed_data_url_is_rejected_without_writing() {
    let (temp, app) = local_app();

    let (status, _, _) = send(
        &app,
        save_request(json!({ "image": "aGVsbG8=", "className": "cat" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(entry_count(&storage_dir(&temp)), 0);
}

#[tokio::test]
async fn invalid_base64_is_rejected_without_writing() {
    let (temp, app) = local_app();

    let (status, _, body) = send(
        &app,
        save_request(json!({ "image": "data:image/png;base64,@@@", "className": "cat" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8_lossy(&body).contains("base64"));
    assert_eq!(entry_count(&storage_dir(&temp)), 0);
}

#[tokio::test]
async fn missing_fields_and_bad_bodies_are_bad_requests() {
    let (temp, app) = local_app();

    for body in [
        json!({ "image": HELLO_DATA_URL }),
        json!({ "className": "cat" }),
        json!({ "image": HELLO_DATA_URL, "className": "" }),
        json!({ "image": HELLO_DATA_URL, "className": "../escape" }),
        json!({ "image": 42, "className": "cat" }),
    ] {
        let (status, _, _) = send(&app, save_request(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
    }

    let not_json = Request::builder()
        .method("POST")
        .uri("/save-image")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("build request");
    let (status, _, _) = send(&app, not_json).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(entry_count(&storage_dir(&temp)), 0);
}

#[tokio::test]
async fn oversized_body_is_payload_too_large() {
    let temp = tempfile::tempdir().expect("tempdir");
    let storage = LocalFileStorage::new(temp.path().to_path_buf()).expect("local storage");
    let app = build_router(Arc::new(storage), 64);

    let big = format!("data:image/png;base64,{}", "A".repeat(256));
    let (status, _, _) = send(&app, save_request(json!({ "image": big, "className": "cat" }))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn retrieval_returns_bytes_with_inferred_content_type() {
    let (_temp, app) = local_app();
    save(&app, "dog").await;

    let (status, headers, body) = send(&app, get_request("/saved_images/dog_1.png")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"hello");
    assert_eq!(
        headers.get(header::CONTENT_TYPE).expect("content type"),
        "image/png"
    );
}

#[tokio::test]
async fn retrieval_of_missing_file_is_not_found() {
    let (_temp, app) = local_app();
    let (status, _, _) = send(&app, get_request("/saved_images/ghost_1.png")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn storage_failures_are_internal_errors_without_details() {
    let (temp, app) = local_app();
    std::fs::remove_dir_all(storage_dir(&temp)).expect("remove storage dir");
    let temp_path = temp.path().to_string_lossy().into_owned();

    let (status, _, body) = send(
        &app,
        save_request(json!({ "image": HELLO_DATA_URL, "className": "cat" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = String::from_utf8_lossy(&body).into_owned();
    assert_eq!(body, "Internal server error");
    assert!(!body.contains(&temp_path));

    let (status, _, body) = send(&app, get_request("/get-images")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, b"Internal server error");
}

#[test]
fn storage_path_occupied_by_a_file_fails_at_startup() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("saved_images");
    std::fs::write(&path, b"not a directory").expect("seed file");

    let config = AppConfig {
        storage_path: path,
        ..AppConfig::default()
    };
    assert!(matches!(
        image_collector::build_storage(&config),
        Err(StartupError::Storage(_))
    ));
}

#[tokio::test]
async fn retrieval_never_escapes_storage_root() {
    let (temp, app) = local_app();
    std::fs::write(temp.path().join("secret.txt"), b"top secret").expect("write secret");

    for uri in [
        "/saved_images/../secret.txt",
        "/saved_images/..%2Fsecret.txt",
        "/saved_images/nested/../../secret.txt",
    ] {
        let (status, _, body) = send(&app, get_request(uri)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "uri: {uri}");
        assert_ne!(body, b"top secret");
    }
}

#[tokio::test]
async fn cross_origin_requests_are_allowed_from_any_origin() {
    let (_temp, app) = local_app();

    let req = Request::builder()
        .uri("/get-images")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .expect("build request");
    let (status, headers, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .expect("allow origin"),
        "*"
    );

    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/save-image")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .expect("build request");
    let (status, headers, _) = send(&app, preflight).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn health_reports_ok() {
    let (_temp, app) = local_app();
    let (status, _, body) = send(&app, get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&body).starts_with("OK"));
}

#[tokio::test]
async fn memory_backend_with_serialized_uploads_serves_same_api() {
    let config = AppConfig {
        storage_type: StorageType::Memory,
        serialize_uploads: true,
        ..AppConfig::default()
    };
    let storage = image_collector::build_storage(&config).expect("storage");
    let app = build_router(storage, config.max_body_bytes);

    assert_eq!(save(&app, "bird").await["file_name"], "bird_1.png");
    assert_eq!(save(&app, "bird").await["file_name"], "bird_2.png");
    assert_eq!(list(&app).await, vec!["bird_1.png", "bird_2.png"]);

    let (status, _, body) = send(&app, get_request("/saved_images/bird_2.png")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"hello");
}
