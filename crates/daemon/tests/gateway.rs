//! End-to-end tests for the HTTP gateway over the built-in drivers.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::request::Parts;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tower::util::ServiceExt;

use keyval_daemon::http_server::interceptor::{Interceptor, Slot};
use keyval_daemon::http_server::{router, ServiceState};
use store::{DriverOptions, Registry, StoreHandle};

async fn memory_handle() -> StoreHandle {
    Registry::with_builtin_drivers()
        .resolve("memory", DriverOptions::None)
        .await
        .unwrap()
}

async fn memory_router() -> (axum::Router, StoreHandle) {
    let handle = memory_handle().await;
    (router(ServiceState::new(handle.clone())), handle)
}

fn request(method: Method, uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(body)
        .unwrap()
}

#[tokio::test]
async fn test_root_is_bad_request_for_all_verbs() {
    let (app, _handle) = memory_router().await;

    for method in [Method::GET, Method::HEAD, Method::POST] {
        let response = app
            .clone()
            .oneshot(request(method.clone(), "/", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{method}");
    }
}

#[tokio::test]
async fn test_get_missing_key_is_not_found() {
    let (app, _handle) = memory_router().await;

    let response = app
        .oneshot(request(Method::GET, "/never-written", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_head_is_an_availability_probe() {
    let (app, handle) = memory_router().await;

    // Free slot reports OK.
    let response = app
        .clone()
        .oneshot(request(Method::HEAD, "/slot", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Occupied slot reports NotFound, with its size.
    handle.store().set_bytes(b"slot", b"taken").await.unwrap();
    let response = app
        .oneshot(request(Method::HEAD, "/slot", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers().get(header::CONTENT_LENGTH).unwrap(),
        "5"
    );
}

#[tokio::test]
async fn test_post_raw_body_roundtrip() {
    let (app, handle) = memory_router().await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/notes/today.txt",
            Body::from("raw body payload"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        handle.store().get_bytes(b"notes/today.txt").await.unwrap(),
        b"raw body payload"
    );

    let response = app
        .oneshot(request(Method::GET, "/notes/today.txt", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; charset=utf-8"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"raw body payload");
}

#[tokio::test]
async fn test_short_png_serves_fully_with_png_type() {
    let (app, handle) = memory_router().await;

    // 10 bytes, PNG magic up front; the sniff consumes it entirely.
    let png: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x01, 0x02];
    handle.store().set_bytes(b"tiny.png", png).await.unwrap();

    let response = app
        .oneshot(request(Method::GET, "/tiny.png", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_LENGTH).unwrap(),
        "10"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], png);
}

#[tokio::test]
async fn test_large_object_streams_fully() {
    let (app, handle) = memory_router().await;

    let payload = vec![b'a'; 10_000];
    handle.store().set_bytes(b"big.txt", &payload).await.unwrap();

    let response = app
        .oneshot(request(Method::GET, "/big.txt", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; charset=utf-8"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.len(), 10_000);
    assert_eq!(&body[..], &payload[..]);
}

#[tokio::test]
async fn test_multipart_file_field() {
    let (app, handle) = memory_router().await;

    let body = concat!(
        "--BOUNDARY\r\n",
        "Content-Disposition: form-data; name=\"comment\"\r\n\r\n",
        "ignored\r\n",
        "--BOUNDARY\r\n",
        "Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n",
        "Content-Type: text/plain\r\n\r\n",
        "hello multipart\r\n",
        "--BOUNDARY--\r\n",
    );

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/upload.txt")
                .header(
                    header::CONTENT_TYPE,
                    "multipart/form-data; boundary=BOUNDARY",
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        handle.store().get_bytes(b"upload.txt").await.unwrap(),
        b"hello multipart"
    );
}

#[tokio::test]
async fn test_multipart_without_file_field_is_bad_request() {
    let (app, _handle) = memory_router().await;

    let body = concat!(
        "--BOUNDARY\r\n",
        "Content-Disposition: form-data; name=\"other\"\r\n\r\n",
        "content\r\n",
        "--BOUNDARY--\r\n",
    );

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/upload.txt")
                .header(
                    header::CONTENT_TYPE,
                    "multipart/form-data; boundary=BOUNDARY",
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_max_age_emits_cache_control() {
    let handle = memory_handle().await;
    handle.store().set_bytes(b"cached", b"value").await.unwrap();

    let app = router(ServiceState::new(handle).with_max_age(Some(600)));
    let response = app
        .oneshot(request(Method::GET, "/cached", Body::empty()))
        .await
        .unwrap();
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "max-age=600"
    );
}

#[tokio::test]
async fn test_etag_from_filesystem_hash() {
    let dir = tempfile::tempdir().unwrap();
    let handle = Registry::with_builtin_drivers()
        .resolve(
            "filesystem",
            serde_json::json!({ "path": dir.path().display().to_string() }),
        )
        .await
        .unwrap();
    handle.store().set_bytes(b"hashed", b"etag me").await.unwrap();

    let app = router(ServiceState::new(handle.clone()));
    let response = app
        .oneshot(request(Method::GET, "/hashed", Body::empty()))
        .await
        .unwrap();

    let info = handle.meta().unwrap().stat(b"hashed").await.unwrap();
    let expected = format!("\"{}\"", hex::encode(info.hash().unwrap()));
    assert_eq!(
        response.headers().get(header::ETAG).unwrap(),
        expected.as_str()
    );
}

#[tokio::test]
async fn test_get_serves_blob_without_metadata_record() {
    let dir = tempfile::tempdir().unwrap();
    let handle = Registry::with_builtin_drivers()
        .resolve(
            "filesystem",
            serde_json::json!({ "path": dir.path().display().to_string() }),
        )
        .await
        .unwrap();

    // Blob landed in the root without going through set, so no Info
    // was ever recorded.
    let payload = "stray content ".repeat(20);
    tokio::fs::write(dir.path().join("stray.txt"), &payload)
        .await
        .unwrap();

    let app = router(ServiceState::new(handle));
    let response = app
        .oneshot(request(Method::GET, "/stray.txt", Body::empty()))
        .await
        .unwrap();

    // The blob still serves; only the stat-derived headers are absent.
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::ETAG).is_none());
    assert!(response.headers().get(header::CONTENT_LENGTH).is_none());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], payload.as_bytes());
}

struct DenyHeader;

#[async_trait::async_trait]
impl Interceptor for DenyHeader {
    async fn before(&self, request: &Parts, slot: &Slot) -> Option<Response> {
        if request.headers.contains_key("x-deny") {
            slot.set("denied", "true");
            return Some(StatusCode::FORBIDDEN.into_response());
        }
        None
    }
}

struct TagResponse;

#[async_trait::async_trait]
impl Interceptor for TagResponse {
    async fn after(&self, response: &mut Response, slot: &Slot) {
        let tag = if slot.get("denied").is_some() {
            "denied"
        } else {
            "passed"
        };
        response.headers_mut().insert("x-tag", tag.parse().unwrap());
    }
}

#[tokio::test]
async fn test_interceptor_chain() {
    let handle = memory_handle().await;
    handle.store().set_bytes(b"guarded", b"value").await.unwrap();

    let state = ServiceState::new(handle)
        .with_interceptors(vec![Arc::new(DenyHeader), Arc::new(TagResponse)]);
    let app = router(state);

    // Short-circuited request still runs the after hooks.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/guarded")
                .header("x-deny", "1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.headers().get("x-tag").unwrap(), "denied");

    let response = app
        .oneshot(request(Method::GET, "/guarded", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-tag").unwrap(), "passed");
}
