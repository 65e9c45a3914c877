//! TemanIsyarat sign detection service: loads the letter and word ONNX
//! classifiers once and serves top-k predictions over HTTP.

use anyhow::{Context, Result};
use isyarat_core::{init_tracing, load_config, mark_ready, shutdown_signal};
use std::sync::Arc;
use tracing::info;

pub mod config;
pub mod http;
pub mod labels;
pub mod metrics;
pub mod model;
pub mod predict;
pub mod preprocess;
pub mod registry;

pub use config::{ConfigError, HttpConfig, ModelsConfig, ServiceConfig};
pub use http::{router, ApiError, AppState};
pub use labels::{ModelKind, LETTER_LABELS, WORD_LABELS};
pub use model::{Classifier, OnnxClassifier, Serialized};
pub use predict::{predict, PredictError, PredictionResult, RankedLabel, DEFAULT_TOP_K};
pub use preprocess::{preprocess, InputTensor, PreprocessError};
pub use registry::{load_registry, Registry, RegistryError};

pub const SERVICE_NAME: &str = "sign-detection";

pub async fn run() -> Result<()> {
    init_tracing(SERVICE_NAME)?;
    let cfg: ServiceConfig = load_config(SERVICE_NAME, config::LIST_KEYS)?;
    cfg.validate().context("invalid configuration")?;
    info!(?cfg, "config loaded");

    let models_cfg = cfg.models.clone();
    let registry = tokio::task::spawn_blocking(move || load_registry(&models_cfg))
        .await
        .context("registry loader panicked")??;
    metrics::set_models_loaded(registry.len());
    info!(models=?registry.available_selectors(), "models loaded");

    let app = router(AppState::new(Arc::new(registry), &cfg), &cfg.http);
    let listener = tokio::net::TcpListener::bind((cfg.http.host.as_str(), cfg.http.port))
        .await
        .with_context(|| format!("bind {}:{}", cfg.http.host, cfg.http.port))?;
    info!(addr=%listener.local_addr()?, "listening");
    mark_ready();

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("shutdown");
    Ok(())
}
