//! Drives the router over a real socket with stub classifiers in place of
//! the ONNX artifacts.
use image::{DynamicImage, ImageFormat, RgbImage};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use sign_detection::{router, AppState, Classifier, HttpConfig, InputTensor, ModelKind, PredictionResult, Registry, ServiceConfig};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

struct Fixed(Vec<f32>);

impl Classifier for Fixed {
    fn forward(&self, _input: InputTensor) -> anyhow::Result<Vec<f32>> { Ok(self.0.clone()) }
}

struct Slow(Duration);

impl Classifier for Slow {
    fn forward(&self, _input: InputTensor) -> anyhow::Result<Vec<f32>> {
        std::thread::sleep(self.0);
        Ok(vec![0.0; 26])
    }
}

fn one_hot(len: usize, hot: usize) -> Vec<f32> {
    (0..len).map(|i| if i == hot { 8.0 } else { 0.0 }).collect()
}

fn png(w: u32, h: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, image::Rgb([120, 80, 200])));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn upload(bytes: Vec<u8>) -> Form {
    Form::new().part("file", Part::bytes(bytes).file_name("hand.png").mime_str("image/png").unwrap())
}

async fn spawn(registry: Registry, http: HttpConfig, timeout: Duration) -> String {
    let mut cfg = ServiceConfig { http, ..ServiceConfig::default() };
    cfg.http.inference_timeout_ms = timeout.as_millis() as u64;
    let app = router(AppState::new(Arc::new(registry), &cfg), &cfg.http);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn letters_only() -> String {
    let registry = Registry::new().with_builtin(ModelKind::Letters, Fixed(one_hot(26, 1)));
    spawn(registry, HttpConfig::default(), Duration::from_secs(10)).await
}

#[tokio::test]
async fn health_reports_loaded_models() {
    let base = letters_only().await;
    let body: Value = Client::new().get(format!("{base}/health")).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["models_loaded"], true);
    assert_eq!(body["available_models"], serde_json::json!(["full"]));
    assert_eq!(body["total_models"], 1);
    assert_eq!(body["labels"]["letters"], 26);
    assert_eq!(body["labels"]["words"], 0);
}

#[tokio::test]
async fn banner_lists_endpoints() {
    let base = letters_only().await;
    let body: Value = Client::new().get(format!("{base}/")).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["status"], "running");
    assert_eq!(body["endpoints"]["detect"], "/api/detect (POST)");
    assert_eq!(body["models"]["available"], serde_json::json!(["full"]));
}

#[tokio::test]
async fn models_info_exposes_label_tables() {
    let base = letters_only().await;
    let body: Value = Client::new().get(format!("{base}/api/models/info")).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["available_models"], serde_json::json!(["full"]));
    assert_eq!(body["labels"]["full"]["count"], 26);
    assert_eq!(body["labels"]["full"]["labels"][0], "A");
    assert!(body["labels"].get("words").is_none());
}

#[tokio::test]
async fn detect_letters_returns_ranked_prediction() {
    let base = letters_only().await;
    let resp = Client::new().post(format!("{base}/api/detect/letters")).multipart(upload(png(64, 48))).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let result: PredictionResult = resp.json().await.unwrap();
    assert_eq!(result.prediction, "B");
    assert_eq!(result.model_used, "full");
    assert_eq!(result.total_classes, 26);
    assert_eq!(result.all_predictions.len(), 3);
    assert_eq!(result.all_predictions[0].letter, "B");
    assert!(result.confidence > 90.0 && result.confidence <= 100.0);
}

#[tokio::test]
async fn detect_defaults_to_letter_model() {
    let base = letters_only().await;
    let resp = Client::new().post(format!("{base}/api/detect")).multipart(upload(png(32, 32))).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let result: PredictionResult = resp.json().await.unwrap();
    assert_eq!(result.model_used, "full");
}

#[tokio::test]
async fn detect_routes_by_model_type() {
    let registry = Registry::new()
        .with_builtin(ModelKind::Letters, Fixed(one_hot(26, 0)))
        .with_builtin(ModelKind::Words, Fixed(one_hot(102, 79)));
    let base = spawn(registry, HttpConfig::default(), Duration::from_secs(10)).await;
    let form = upload(png(32, 32)).text("model_type", "words");
    let resp = Client::new().post(format!("{base}/api/detect")).multipart(form).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let result: PredictionResult = resp.json().await.unwrap();
    assert_eq!(result.prediction, "Rumah");
    assert_eq!(result.model_used, "words");
    assert_eq!(result.total_classes, 102);
}

#[tokio::test]
async fn unknown_model_type_is_rejected_with_available_models() {
    let base = letters_only().await;
    let form = upload(png(32, 32)).text("model_type", "digits");
    let resp = Client::new().post(format!("{base}/api/detect")).multipart(form).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["available_models"], serde_json::json!(["full"]));
}

#[tokio::test]
async fn unloaded_words_model_is_unavailable() {
    let base = letters_only().await;
    let resp = Client::new().post(format!("{base}/api/detect/words")).multipart(upload(png(32, 32))).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("word"));
    assert_eq!(body["available_models"], serde_json::json!(["full"]));
}

#[tokio::test]
async fn undecodable_image_is_bad_request() {
    let base = letters_only().await;
    let resp = Client::new()
        .post(format!("{base}/api/detect/letters"))
        .multipart(upload(b"definitely not an image".to_vec()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body.get("available_models").is_none());
}

#[tokio::test]
async fn missing_file_field_is_bad_request() {
    let base = letters_only().await;
    let form = Form::new().text("model_type", "full");
    let resp = Client::new().post(format!("{base}/api/detect")).multipart(form).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let registry = Registry::new().with_builtin(ModelKind::Letters, Fixed(one_hot(26, 0)));
    let cfg = HttpConfig { max_upload_bytes: 1024, ..HttpConfig::default() };
    let base = spawn(registry, cfg, Duration::from_secs(10)).await;
    let resp = Client::new().post(format!("{base}/api/detect/letters")).multipart(upload(vec![0u8; 64 * 1024])).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn slow_inference_times_out() {
    let registry = Registry::new().with_builtin(ModelKind::Letters, Slow(Duration::from_millis(500)));
    let base = spawn(registry, HttpConfig::default(), Duration::from_millis(50)).await;
    let resp = Client::new().post(format!("{base}/api/detect/letters")).multipart(upload(png(16, 16))).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let base = letters_only().await;
    let resp = Client::new()
        .request(reqwest::Method::OPTIONS, format!("{base}/api/detect"))
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let headers = resp.headers();
    assert_eq!(headers["access-control-allow-origin"], "http://localhost:3000");
    assert_eq!(headers["access-control-allow-credentials"], "true");
}

#[tokio::test]
async fn metrics_count_predictions() {
    let base = letters_only().await;
    let client = Client::new();
    let resp = client.post(format!("{base}/api/detect/letters")).multipart(upload(png(16, 16))).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = client.get(format!("{base}/metrics")).send().await.unwrap().text().await.unwrap();
    assert!(body.contains("isyarat_predictions_total"), "missing prediction counter");
    assert!(body.contains("isyarat_inference_latency_ms"), "missing latency histogram");
}

#[tokio::test]
async fn readiness_follows_core_flag() {
    let base = letters_only().await;
    isyarat_core::mark_ready();
    let resp = Client::new().get(format!("{base}/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let live: Value = Client::new().get(format!("{base}/live")).send().await.unwrap().json().await.unwrap();
    assert_eq!(live["live"], true);
}

#[tokio::test]
async fn non_finite_scores_are_server_errors() {
    let mut scores = one_hot(26, 2);
    scores[5] = f32::NAN;
    let base = spawn(Registry::new().with_builtin(ModelKind::Letters, Fixed(scores)), HttpConfig::default(), Duration::from_secs(10)).await;
    let resp = Client::new().post(format!("{base}/api/detect/letters")).multipart(upload(png(16, 16))).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("non-finite"));
}
