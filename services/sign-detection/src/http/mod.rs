//! HTTP surface: banner, health, model info and the detect endpoints.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::{HttpConfig, ServiceConfig};
use crate::registry::Registry;

mod error;
mod middleware;
mod routes;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub top_k: usize,
    pub inference_timeout: Duration,
    /// One permit per forward pass in flight on the blocking pool.
    pub inference_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, cfg: &ServiceConfig) -> Self {
        Self {
            registry,
            top_k: cfg.models.top_k,
            inference_timeout: cfg.http.inference_timeout(),
            inference_slots: Arc::new(Semaphore::new(cfg.http.max_concurrent_inference)),
        }
    }
}

pub fn router(state: AppState, cfg: &HttpConfig) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/api/models/info", get(routes::models_info))
        .route("/api/detect", post(routes::detect))
        .route("/api/detect/letters", post(routes::detect_letters))
        .route("/api/detect/words", post(routes::detect_words))
        .merge(isyarat_core::health_routes::<AppState>())
        .layer(DefaultBodyLimit::max(cfg.max_upload_bytes))
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(middleware::cors_layer(&cfg.cors_origins))
        .with_state(state)
}
