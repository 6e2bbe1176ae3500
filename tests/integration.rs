use axum::body::{to_bytes, Body};
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use shotlens::{
    ai::{MockModelClient, ModelService, ResponsesClient},
    analysis::{AnalysisSettings, Analyzer},
    app::AppState,
    config::{AnalysisMode, Config},
    server,
};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MAX_BODY: usize = 1024 * 1024;

fn config(vars: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

fn app_with_upstream(upstream: &MockServer, extra: &[(&str, &str)]) -> Router {
    let uri = upstream.uri();
    let mut vars = vec![
        ("AI_API_KEY", "test-key"),
        ("VISION_MODEL", "vision-model"),
        ("THINKING_MODEL", "thinking-model"),
        ("MODEL_API_BASE_URL", uri.as_str()),
    ];
    vars.extend_from_slice(extra);
    let config = config(&vars);
    let state = AppState::from_config(&config).unwrap();
    server::router(Arc::new(state), MAX_BODY)
}

fn app_with_mock(mock: Arc<MockModelClient>, static_root: PathBuf) -> Router {
    let config = config(&[("AI_API_KEY", "k"), ("VISION_MODEL", "vision-model")]);
    let models: Arc<dyn ModelService> = mock;
    let analyzer = Analyzer::new(models, AnalysisSettings::from(&config));
    server::router(Arc::new(AppState::new(analyzer, static_root)), MAX_BODY)
}

fn images(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("data:image/png;base64,SHOT{}", i))
        .collect()
}

fn analyze_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_sequential_analysis_end_to_end() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .and(body_string_contains("\"model\":\"vision-model\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": [{ "type": "message", "content": [{ "type": "output_text", "text": "a tense standoff" }] }]
        })))
        .expect(5)
        .mount(&upstream)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .and(body_string_contains("\"model\":\"thinking-model\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "Push the left lane." } }]
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let app = app_with_upstream(&upstream, &[]);
    let response = app
        .oneshot(analyze_request(json!({ "images": images(5) })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = json_body(response).await;
    assert_eq!(body, json!({ "resultText": "Push the left lane." }));

    let requests = upstream.received_requests().await.unwrap();
    assert_eq!(requests.len(), 6);

    // The reasoning call comes last and carries every labeled block.
    let last: Value = serde_json::from_slice(&requests[5].body).unwrap();
    assert_eq!(last["model"], "thinking-model");
    let summary = last["input"][0]["content"][1]["text"].as_str().unwrap();
    for i in 1..=5 {
        assert!(summary.contains(&format!("Image {}:\na tense standoff", i)));
    }

    let first: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(first["input"][0]["role"], "user");
    assert_eq!(first["input"][0]["content"][1]["type"], "input_image");
    assert_eq!(
        first["input"][0]["content"][1]["image_url"],
        "data:image/png;base64,SHOT0"
    );
    assert!(first["input"][0]["content"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("Screenshot 1 of 5."));
}

#[tokio::test]
async fn test_batched_analysis_makes_two_calls() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "output_text": "Image 1: lobby" })),
        )
        .expect(2)
        .mount(&upstream)
        .await;

    let app = app_with_upstream(&upstream, &[("ANALYSIS_MODE", "batched")]);
    let response = app
        .oneshot(analyze_request(json!({ "images": images(3) })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let requests = upstream.received_requests().await.unwrap();
    let vision: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(vision["input"][0]["content"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_too_few_images_rejected_without_upstream_calls() {
    let upstream = MockServer::start().await;
    let app = app_with_upstream(&upstream, &[]);

    let response = app
        .oneshot(analyze_request(json!({ "images": images(1) })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "validation");
    assert!(body["error"].as_str().unwrap().contains("between 2 and 9"));
    assert!(upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_configured_bounds_apply() {
    let upstream = MockServer::start().await;
    let app = app_with_upstream(&upstream, &[("MIN_IMAGES", "5"), ("MAX_IMAGES", "9")]);

    let response = app
        .oneshot(analyze_request(json!({ "images": images(4) })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let upstream = MockServer::start().await;
    let app = app_with_upstream(&upstream, &[]);

    let request = Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_missing_credentials_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&[("VISION_MODEL", "vision-model")]);
    let state = AppState::new(
        Analyzer::new(
            Arc::new(MockModelClient::new()),
            AnalysisSettings::from(&config),
        ),
        dir.path().to_path_buf(),
    );
    let app = server::router(Arc::new(state), MAX_BODY);

    let response = app
        .oneshot(analyze_request(json!({ "images": images(2) })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "configuration");
}

#[tokio::test]
async fn test_upstream_status_is_reported() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&upstream)
        .await;

    let app = app_with_upstream(&upstream, &[]);
    let response = app
        .oneshot(analyze_request(json!({ "images": images(3) })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "upstream_status");
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("401"));
    assert!(message.contains("invalid api key"));
}

#[tokio::test]
async fn test_upstream_timeout_is_reported() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "output_text": "too late" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&upstream)
        .await;

    let app = app_with_upstream(&upstream, &[("REQUEST_TIMEOUT_MS", "100")]);
    let response = app
        .oneshot(analyze_request(json!({ "images": images(2) })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "upstream_timeout");
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with_mock(Arc::new(MockModelClient::new()), dir.path().to_path_buf());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "ok": true }));
}

#[tokio::test]
async fn test_client_request_id_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockModelClient::new());
    let app = app_with_mock(mock, dir.path().to_path_buf());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .header("x-request-id", "client-chosen\tid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let echoed = response.headers()["x-request-id"].to_str().unwrap();
    assert_ne!(echoed, "client-chosen\tid");
    assert!(uuid::Uuid::parse_str(echoed).is_ok(), "not a uuid: {}", echoed);

    let mut request = analyze_request(json!({ "images": images(2) }));
    request
        .headers_mut()
        .insert("x-request-id", "replayed-id".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let echoed = response.headers()["x-request-id"].to_str().unwrap();
    assert_ne!(echoed, "replayed-id");
    assert!(uuid::Uuid::parse_str(echoed).is_ok());
}

#[tokio::test]
async fn test_wrong_method_on_analyze() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockModelClient::new());
    let app = app_with_mock(mock.clone(), dir.path().to_path_buf());

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/analyze")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "method_not_allowed");
    assert_eq!(mock.get_call_count(), 0);
}

#[tokio::test]
async fn test_static_files_are_served_with_content_type() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("public");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("index.html"), "<h1>shotlens</h1>").unwrap();
    fs::write(root.join("app.js"), "console.log(1)").unwrap();
    fs::write(root.join("data.bin"), [0u8, 1, 2]).unwrap();
    fs::write(dir.path().join("secret.txt"), "nope").unwrap();

    let app = app_with_mock(Arc::new(MockModelClient::new()), root);

    let get = |uri: &str| {
        Request::builder()
            .uri(uri.to_string())
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<h1>shotlens</h1>");

    let response = app.clone().oneshot(get("/app.js")).await.unwrap();
    assert_eq!(
        response.headers()[CONTENT_TYPE],
        "text/javascript; charset=utf-8"
    );

    let response = app.clone().oneshot(get("/data.bin")).await.unwrap();
    assert_eq!(response.headers()[CONTENT_TYPE], "application/octet-stream");

    let response = app.clone().oneshot(get("/..%2fsecret.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.clone().oneshot(get("/missing.css")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/index.html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_mode_config_reaches_analyzer() {
    let config = config(&[("ANALYSIS_MODE", "batched"), ("VISION_CONCURRENCY", "4")]);
    let analyzer = Analyzer::new(
        Arc::new(ResponsesClient::new(Duration::from_secs(1))),
        AnalysisSettings::from(&config),
    );
    assert_eq!(analyzer.settings().mode, AnalysisMode::Batched);
    assert_eq!(analyzer.settings().vision_concurrency, 4);
}
