use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::Json;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::{ApiError, AppState};
use crate::labels::ModelKind;
use crate::metrics;
use crate::predict::{predict, PredictionResult};

pub const SERVICE_TITLE: &str = "TemanIsyarat API";

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": format!("{SERVICE_TITLE} - SIBI sign language detection"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "models_info": "/api/models/info",
            "detect": "/api/detect (POST)",
            "detect_letters": "/api/detect/letters (POST)",
            "detect_words": "/api/detect/words (POST)",
            "metrics": "/metrics",
        },
        "models": {
            "loaded": !state.registry.is_empty(),
            "available": state.registry.available_selectors(),
        },
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let registry = &state.registry;
    let count = |kind| registry.labels(kind).map_or(0, <[String]>::len);
    Json(json!({
        "status": "healthy",
        "message": format!("{SERVICE_TITLE} backend is running"),
        "models_loaded": !registry.is_empty(),
        "available_models": registry.available_selectors(),
        "total_models": registry.len(),
        "labels": {
            "letters": count(ModelKind::Letters),
            "words": count(ModelKind::Words),
        },
    }))
}

pub async fn models_info(State(state): State<AppState>) -> Json<Value> {
    let labels: Map<String, Value> = state
        .registry
        .label_sets()
        .map(|(kind, labels)| (kind.selector().to_string(), json!({"count": labels.len(), "labels": labels})))
        .collect();
    Json(json!({
        "available_models": state.registry.available_selectors(),
        "labels": labels,
    }))
}

pub async fn detect(State(state): State<AppState>, multipart: Multipart) -> Result<Json<PredictionResult>, ApiError> {
    let upload = read_upload(multipart).await?;
    let selector = upload.model_type.unwrap_or_else(|| ModelKind::Letters.selector().to_string());
    run_prediction(&state, upload.image, selector).await.map(Json)
}

pub async fn detect_letters(State(state): State<AppState>, multipart: Multipart) -> Result<Json<PredictionResult>, ApiError> {
    detect_fixed(state, ModelKind::Letters, multipart).await
}

pub async fn detect_words(State(state): State<AppState>, multipart: Multipart) -> Result<Json<PredictionResult>, ApiError> {
    detect_fixed(state, ModelKind::Words, multipart).await
}

async fn detect_fixed(state: AppState, kind: ModelKind, multipart: Multipart) -> Result<Json<PredictionResult>, ApiError> {
    if state.registry.model(kind).is_none() {
        return Err(ApiError::ModelNotLoaded { kind, available: state.registry.available_selectors() });
    }
    let upload = read_upload(multipart).await?;
    run_prediction(&state, upload.image, kind.selector().to_string()).await.map(Json)
}

struct Upload {
    image: Bytes,
    model_type: Option<String>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut image = None;
    let mut model_type = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                debug!(filename = ?field.file_name(), content_type = ?field.content_type(), "upload received");
                image = Some(field.bytes().await?);
            }
            Some("model_type") => model_type = Some(field.text().await?.trim().to_string()),
            _ => {}
        }
    }
    let image = image.ok_or(ApiError::MissingFile)?;
    Ok(Upload { image, model_type: model_type.filter(|m| !m.is_empty()) })
}

/// Inference is CPU bound, so it runs on the blocking pool. The permit moves
/// into the blocking task: a pass detached by a timeout keeps its slot until
/// it actually finishes. Waiting for a slot counts against the timeout.
async fn run_prediction(state: &AppState, image: Bytes, selector: String) -> Result<PredictionResult, ApiError> {
    let model_label = selector.parse::<ModelKind>().map(ModelKind::selector).unwrap_or("unknown");
    info!(model = model_label, bytes = image.len(), "detect request");
    let registry = Arc::clone(&state.registry);
    let slots = Arc::clone(&state.inference_slots);
    let top_k = state.top_k;
    let task = async move {
        let permit = slots.acquire_owned().await.map_err(|e| ApiError::Worker(e.to_string()))?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            predict(&image, &selector, &registry, top_k)
        })
        .await
        .map_err(|join| ApiError::Worker(join.to_string()))?
        .map_err(ApiError::from)
    };
    let outcome = match tokio::time::timeout(state.inference_timeout, task).await {
        Err(_) => Err(ApiError::Timeout(state.inference_timeout)),
        Ok(result) => result,
    };
    metrics::record_prediction(model_label, if outcome.is_ok() { "ok" } else { "error" });
    outcome
}
