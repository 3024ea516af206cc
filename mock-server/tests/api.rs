use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

// --- fixed bodies ---

#[tokio::test]
async fn ok_returns_200_with_body() {
    let resp = app().oneshot(empty_request("GET", "/ok")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&body_bytes(resp).await[..], b"ok");
}

#[tokio::test]
async fn empty_returns_200_without_body() {
    let resp = app().oneshot(empty_request("GET", "/empty")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn lines_mixes_line_endings() {
    let resp = app().oneshot(empty_request("GET", "/lines")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&body_bytes(resp).await[..], b"first\r\nsecond\nthird\n");
}

// --- failures ---

#[tokio::test]
async fn missing_returns_404_with_body() {
    let resp = app().oneshot(empty_request("GET", "/missing")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(&body_bytes(resp).await[..], b"not found");
}

#[tokio::test]
async fn missing_answers_any_method() {
    let resp = app()
        .oneshot(json_request("POST", "/missing", "{}"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_echoes_requested_code() {
    let resp = app()
        .oneshot(empty_request("GET", "/status/503"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(&body_bytes(resp).await[..], b"status 503");
}

#[tokio::test]
async fn status_out_of_range_returns_400() {
    let resp = app()
        .oneshot(empty_request("GET", "/status/42"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let resp = app().oneshot(empty_request("GET", "/nope")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- echo ---

#[tokio::test]
async fn echo_reports_method_content_type_and_body() {
    let resp = app()
        .oneshot(json_request("POST", "/echo", r#"{"a":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.content_type.as_deref(), Some("application/json"));
    assert_eq!(echo.body, r#"{"a":1}"#);
}

#[tokio::test]
async fn echo_without_body() {
    let resp = app().oneshot(empty_request("DELETE", "/echo")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "DELETE");
    assert!(echo.content_type.is_none());
    assert!(echo.body.is_empty());
}

// --- slow ---

#[tokio::test]
async fn slow_responds_after_delay() {
    let started = std::time::Instant::now();
    let resp = app()
        .oneshot(empty_request("GET", "/slow/50"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(started.elapsed() >= std::time::Duration::from_millis(50));
    assert_eq!(&body_bytes(resp).await[..], b"slow");
}

// --- large ---

#[tokio::test]
async fn large_returns_requested_size() {
    let resp = app()
        .oneshot(empty_request("GET", "/large/2"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body_bytes(resp).await;
    assert_eq!(bytes.len(), 2048);
    assert!(bytes.iter().all(|&b| b == b'a'));
}
