//! HTTP scenarios through the router.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use bucketdb_core::{BucketRead, Database};
use bucketdb_server::{create_router, AppState, ServerConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app() -> (Router, Arc<Database>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let state = Arc::new(AppState::new(Arc::clone(&db), ServerConfig::default()));
    (create_router(state), db)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Vec<u8>) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn error_body(message: &str) -> Value {
    json!({ "Error": message })
}

#[tokio::test]
async fn bucket_lifecycle() {
    let (app, _db) = app();

    let (status, body) = send_json(&app, Method::GET, "/api/v1/buckets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = send(&app, Method::POST, "/api/v1/buckets", Some(r#"{"name":"bucket1"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    let (_, body) = send_json(&app, Method::GET, "/api/v1/buckets", None).await;
    assert_eq!(body, json!(["bucket1"]));

    let (status, body) =
        send_json(&app, Method::POST, "/api/v1/buckets", Some(r#"{"name":"bucket1"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, error_body("bucket already exists"));

    let (_, body) = send_json(&app, Method::GET, "/api/v1/buckets", None).await;
    assert_eq!(body, json!(["bucket1"]));

    let (status, _) = send(&app, Method::DELETE, "/api/v1/buckets/bucket1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(&app, Method::GET, "/api/v1/buckets/bucket1", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, error_body("bucket doesn't exist"));

    let (status, body) = send_json(&app, Method::DELETE, "/api/v1/buckets/bucket1", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, error_body("bucket doesn't exist"));
}

#[tokio::test]
async fn create_bucket_rejects_bad_names() {
    let (app, _db) = app();

    let (status, body) =
        send_json(&app, Method::POST, "/api/v1/buckets", Some(r#"{"name":"   "}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, error_body("invalid bucket name"));

    let (status, body) = send_json(&app, Method::POST, "/api/v1/buckets", Some("{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, error_body("invalid bucket name"));

    let (status, body) = send_json(&app, Method::POST, "/api/v1/buckets", Some("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, error_body("error reading bucket name"));
}

#[tokio::test]
async fn created_names_are_trimmed() {
    let (app, db) = app();

    send(&app, Method::POST, "/api/v1/buckets", Some(r#"{"name":"  fruit "}"#)).await;
    assert_eq!(db.view(|tx| tx.list_buckets()).unwrap(), vec!["fruit"]);

    let (status, body) = send_json(&app, Method::GET, "/api/v1/buckets/fruit", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn item_lifecycle() {
    let (app, _db) = app();
    send(&app, Method::POST, "/api/v1/buckets", Some(r#"{"name":"bucket1"}"#)).await;

    let doc = json!({"name": "apple", "price": 2.5, "isRipe": true});
    let item = json!({"Key": "item1", "Value": doc}).to_string();
    let (status, body) = send(&app, Method::POST, "/api/v1/buckets/bucket1", Some(&item)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    let (status, body) = send_json(&app, Method::GET, "/api/v1/buckets/bucket1/item1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, doc);

    let replacement = json!({"name": "apple", "price": 3.0});
    let (status, body) = send_json(
        &app,
        Method::PUT,
        "/api/v1/buckets/bucket1/item1",
        Some(&replacement.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, replacement);

    let (_, body) = send_json(&app, Method::GET, "/api/v1/buckets/bucket1/item1", None).await;
    assert_eq!(body, replacement);

    let (status, _) = send(&app, Method::DELETE, "/api/v1/buckets/bucket1/item1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(&app, Method::GET, "/api/v1/buckets/bucket1/item1", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, error_body("item not found"));
}

#[tokio::test]
async fn floats_survive_the_round_trip() {
    let (app, _db) = app();
    send(&app, Method::POST, "/api/v1/buckets", Some(r#"{"name":"b"}"#)).await;

    let doc = json!({"tiny": 1.0715660391465826e-75, "third": 1.0 / 3.0, "neg": -2.5e300});
    let item = json!({"Key": "k", "Value": doc}).to_string();
    let (status, _) = send(&app, Method::POST, "/api/v1/buckets/b", Some(&item)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send_json(&app, Method::GET, "/api/v1/buckets/b/k", None).await;
    assert_eq!(body, doc);
}

#[tokio::test]
async fn write_waiting_past_the_timeout_is_not_committed() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let config = ServerConfig::default().with_request_timeout(Duration::from_millis(100));
    let app = create_router(Arc::new(AppState::new(Arc::clone(&db), config)));
    send(&app, Method::POST, "/api/v1/buckets", Some(r#"{"name":"b"}"#)).await;

    let holder = db.begin_write().unwrap();
    let item = r#"{"Key":"k","Value":1}"#;
    let (status, body) = send_json(&app, Method::POST, "/api/v1/buckets/b", Some(item)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, error_body("error creating bucket item"));

    // A blocking task still queued on the slot would commit as soon as it frees.
    drop(holder);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let (_, body) = send_json(&app, Method::GET, "/api/v1/buckets/b", None).await;
    assert_eq!(body, json!([]));
    assert!(db.view(|tx| tx.list_keys("b")).unwrap().is_empty());

    let (status, _) = send(&app, Method::POST, "/api/v1/buckets/b", Some(item)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn keys_are_listed_in_order() {
    let (app, _db) = app();
    send(&app, Method::POST, "/api/v1/buckets", Some(r#"{"name":"b"}"#)).await;
    for key in ["item2", "item1"] {
        let item = json!({"Key": key, "Value": key}).to_string();
        send(&app, Method::POST, "/api/v1/buckets/b", Some(&item)).await;
    }

    let (status, body) = send_json(&app, Method::GET, "/api/v1/buckets/b", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["item1", "item2"]));
}

#[tokio::test]
async fn put_creates_missing_item() {
    let (app, _db) = app();
    send(&app, Method::POST, "/api/v1/buckets", Some(r#"{"name":"b"}"#)).await;

    let (status, body) = send_json(&app, Method::PUT, "/api/v1/buckets/b/new", Some("[1,2,3]")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([1, 2, 3]));

    let (_, body) = send_json(&app, Method::GET, "/api/v1/buckets/b", None).await;
    assert_eq!(body, json!(["new"]));
}

#[tokio::test]
async fn deleting_missing_key_succeeds() {
    let (app, _db) = app();
    send(&app, Method::POST, "/api/v1/buckets", Some(r#"{"name":"b"}"#)).await;

    let (status, _) = send(&app, Method::DELETE, "/api/v1/buckets/b/absent", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn item_operations_on_missing_bucket() {
    let (app, db) = app();
    let item = json!({"Key": "k", "Value": 1}).to_string();

    let (status, body) = send_json(&app, Method::POST, "/api/v1/buckets/nope", Some(&item)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, error_body("error creating bucket item"));

    let (status, body) = send_json(&app, Method::GET, "/api/v1/buckets/nope/k", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, error_body("bucket doesn't exist"));

    let (status, body) = send_json(&app, Method::PUT, "/api/v1/buckets/nope/k", Some("1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, error_body("error updating bucket item"));

    let (status, body) = send_json(&app, Method::DELETE, "/api/v1/buckets/nope/k", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, error_body("error deleting bucket item"));

    assert!(db.view(|tx| tx.list_buckets()).unwrap().is_empty());
    assert!(db.state().is_idle());
}

#[tokio::test]
async fn malformed_item_body() {
    let (app, _db) = app();
    send(&app, Method::POST, "/api/v1/buckets", Some(r#"{"name":"b"}"#)).await;

    let (status, body) = send_json(&app, Method::POST, "/api/v1/buckets/b", Some("{oops")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, error_body("error reading bucket item"));

    let (status, body) = send_json(&app, Method::PUT, "/api/v1/buckets/b/k", Some("{oops")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, error_body("error reading bucket item"));
}

#[tokio::test]
async fn empty_key_is_a_client_error() {
    let (app, _db) = app();
    send(&app, Method::POST, "/api/v1/buckets", Some(r#"{"name":"b"}"#)).await;

    let item = json!({"Key": "", "Value": 1}).to_string();
    let (status, body) = send_json(&app, Method::POST, "/api/v1/buckets/b", Some(&item)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, error_body("error creating bucket item"));
}

#[tokio::test]
async fn non_json_body_is_unsupported() {
    let (app, _db) = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/buckets")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(r#"{"name":"b"}"#))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (_, body) = send_json(&app, Method::GET, "/api/v1/buckets", None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn unknown_routes_and_methods() {
    let (app, _db) = app();

    let (status, body) = send_json(&app, Method::GET, "/api/v2/buckets", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, error_body("resource not found"));

    let (status, _) = send(&app, Method::PATCH, "/api/v1/buckets", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn state_is_durable_behind_the_api() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("api.db");

    {
        let db = Arc::new(Database::open(&path).unwrap());
        let state = Arc::new(AppState::new(Arc::clone(&db), ServerConfig::default()));
        let app = create_router(state);
        send(&app, Method::POST, "/api/v1/buckets", Some(r#"{"name":"b"}"#)).await;
        send(&app, Method::PUT, "/api/v1/buckets/b/k", Some(r#"{"v":1}"#)).await;
        db.close().unwrap();
    }

    let db = Database::open(&path).unwrap();
    assert_eq!(
        db.view(|tx| tx.get_document("b", b"k")).unwrap(),
        json!({"v": 1})
    );
}
