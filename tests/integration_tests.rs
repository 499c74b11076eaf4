use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use vision_gate::config::Config;
use vision_gate::server::create_app;
use vision_gate::vision::{ImageAnalyzer, UpstreamError};

struct MockAnalyzer {
    calls: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl MockAnalyzer {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail,
        })
    }
}

#[async_trait]
impl ImageAnalyzer for MockAnalyzer {
    async fn analyze(&self, url: &str, gender_neutral: &str) -> Result<Vec<u8>, UpstreamError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), gender_neutral.to_string()));

        if self.fail {
            Err(UpstreamError::Api {
                status: 503,
                body: "upstream unavailable".to_string(),
            })
        } else {
            Ok(br#"{"captionResult":{"text":"a dog on grass"}}"#.to_vec())
        }
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.allowed_origins = vec!["https://example.com".to_string()];
    config.vision_endpoint = "https://vision.invalid".to_string();
    config.vision_key = "test-key".to_string();
    config
}

fn app_with(analyzer: Arc<MockAnalyzer>) -> Router {
    create_app(&test_config(), analyzer)
}

fn analyze_request(ip: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/analyzeImage")
        .header("content-type", "application/json")
        .header("origin", "https://example.com")
        .header("x-real-ip", ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_analyze_image_success() {
    let analyzer = MockAnalyzer::new(false);
    let app = app_with(analyzer.clone());

    let response = app
        .oneshot(analyze_request(
            "203.0.113.1",
            r#"{"url": "https://example.com/dog.jpg", "genderNeutral": true}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["captionResult"]["text"], "a dog on grass");

    let calls = analyzer.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![("https://example.com/dog.jpg".to_string(), "true".to_string())]
    );
}

#[tokio::test]
async fn test_security_headers_on_every_route() {
    let app = app_with(MockAnalyzer::new(false));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["X-Frame-Options"], "DENY");
    assert_eq!(headers["X-Content-Type-Options"], "nosniff");
    assert_eq!(headers["X-XSS-Protection"], "1; mode=block");
    assert_eq!(
        headers["Strict-Transport-Security"],
        "max-age=31536000; includeSubDomains"
    );
    assert!(headers.contains_key("Content-Security-Policy"));
}

#[tokio::test]
async fn test_missing_origin_is_rejected() {
    let app = app_with(MockAnalyzer::new(false));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/analyzeImage")
                .header("content-type", "application/json")
                .header("x-real-ip", "203.0.113.1")
                .body(Body::from(r#"{"url": "https://example.com/dog.jpg"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "Not allowed by CORS");
}

#[tokio::test]
async fn test_unlisted_origin_is_rejected_without_echo() {
    let analyzer = MockAnalyzer::new(false);
    let app = app_with(analyzer.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/analyzeImage")
                .header("content-type", "application/json")
                .header("origin", "https://evil.example.net")
                .header("x-real-ip", "203.0.113.1")
                .body(Body::from(r#"{"url": "https://example.com/dog.jpg"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert!(!json.to_string().contains("evil.example.net"));
    assert!(analyzer.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_wrong_content_type_is_400() {
    let analyzer = MockAnalyzer::new(false);
    let app = app_with(analyzer.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/analyzeImage")
                .header("content-type", "text/plain")
                .header("origin", "https://example.com")
                .header("x-real-ip", "203.0.113.1")
                .body(Body::from(r#"{"url": "https://example.com/dog.jpg"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Content-Type must be application/json"
    );
    assert!(analyzer.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_and_invalid_url_bodies() {
    let app = app_with(MockAnalyzer::new(false));

    let response = app
        .clone()
        .oneshot(analyze_request("203.0.113.1", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Image URL is required");

    let response = app
        .oneshot(analyze_request("203.0.113.1", r#"{"url": "not a url"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid image URL format");
}

#[tokio::test]
async fn test_oversized_declared_body_is_413() {
    let app = app_with(MockAnalyzer::new(false));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/analyzeImage")
                .header("content-type", "application/json")
                .header("origin", "https://example.com")
                .header("content-length", (11 * 1024 * 1024).to_string())
                .header("x-real-ip", "203.0.113.1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        body_json(response).await["error"],
        "Request too large. Maximum size is 10MB."
    );
}

#[tokio::test]
async fn test_sixth_request_per_minute_is_429() {
    let analyzer = MockAnalyzer::new(false);
    let app = app_with(analyzer.clone());
    let body = r#"{"url": "https://example.com/dog.jpg"}"#;

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(analyze_request("203.0.113.9", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(analyze_request("203.0.113.9", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Too many requests, please try again later.");
    assert_eq!(json["retryAfter"], 60);
    assert_eq!(analyzer.calls.lock().unwrap().len(), 5);
}

#[tokio::test]
async fn test_rate_limits_are_per_client() {
    let app = app_with(MockAnalyzer::new(false));
    let body = r#"{"url": "https://example.com/dog.jpg"}"#;

    for _ in 0..6 {
        app.clone()
            .oneshot(analyze_request("198.51.100.1", body))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(analyze_request("198.51.100.2", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upstream_failure_returns_generic_500() {
    let app = app_with(MockAnalyzer::new(true));

    let response = app
        .oneshot(analyze_request(
            "203.0.113.1",
            r#"{"url": "https://example.com/dog.jpg"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "An error occurred while processing the image. Please try again."
    );
    assert!(!json.to_string().contains("upstream unavailable"));
}

#[tokio::test]
async fn test_disallowed_method_on_analyze_route() {
    let analyzer = MockAnalyzer::new(false);
    let app = app_with(analyzer.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/analyzeImage")
                .header("origin", "https://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_json(response).await["error"], "Method not allowed");
    assert!(analyzer.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_hello_route_echoes() {
    let app = app_with(MockAnalyzer::new(false));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/hello/world")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"CI CD WORKS Hello + world");
}

#[tokio::test]
async fn test_health_route() {
    let app = app_with(MockAnalyzer::new(false));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = app_with(MockAnalyzer::new(false));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Not found");
}
