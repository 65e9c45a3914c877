//! Prediction engine: selector dispatch, forward pass, softmax and top-k.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::labels::ModelKind;
use crate::metrics;
use crate::preprocess::{preprocess, PreprocessError};
use crate::registry::Registry;

pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedLabel {
    pub letter: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: String,
    pub confidence: f64,
    pub all_predictions: Vec<RankedLabel>,
    pub model_used: String,
    pub total_classes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass { ClientInput, Internal }

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("model '{requested}' is not available; available models: {available:?}")]
    ModelUnavailable { requested: String, available: Vec<String> },
    #[error("label mapping for model '{0}' is not available")]
    LabelsUnavailable(ModelKind),
    #[error("top_k must be at least 1")]
    InvalidTopK,
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error("inference failed: {0:#}")]
    Inference(anyhow::Error),
    #[error("model '{0}' produced no valid prediction")]
    NoValidPrediction(ModelKind),
    #[error("model '{0}' produced non-finite scores")]
    NonFiniteScores(ModelKind),
}

impl PredictError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PredictError::ModelUnavailable { .. } | PredictError::InvalidTopK | PredictError::Preprocess(_) => ErrorClass::ClientInput,
            PredictError::LabelsUnavailable(_)
            | PredictError::Inference(_)
            | PredictError::NoValidPrediction(_)
            | PredictError::NonFiniteScores(_) => ErrorClass::Internal,
        }
    }
}

/// Softmax over raw scores, scaled to percentages summing to 100.
pub fn softmax_percent(scores: &[f32]) -> Vec<f64> {
    if scores.is_empty() { return Vec::new(); }
    let max = scores.iter().map(|&s| s as f64).fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|&s| (s as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if sum > 0.0 && sum.is_finite() { exps.iter().map(|e| e / sum * 100.0).collect() } else { vec![0.0; scores.len()] }
}

/// Indices of the `k` largest values, descending; equal values keep the lower index first.
pub fn top_k_indices(values: &[f64], k: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    idx.truncate(k);
    idx
}

/// Runs one image through the model registered under `selector` and ranks the
/// `top_k` most likely labels. Purely request scoped: nothing is cached.
#[instrument(skip(image, registry), fields(bytes = image.len()))]
pub fn predict(image: &[u8], selector: &str, registry: &Registry, top_k: usize) -> Result<PredictionResult, PredictError> {
    let (kind, model) = selector
        .parse::<ModelKind>()
        .ok()
        .and_then(|kind| registry.model(kind).map(|model| (kind, model)))
        .ok_or_else(|| PredictError::ModelUnavailable { requested: selector.to_string(), available: registry.available_selectors() })?;
    let labels = registry.labels(kind).ok_or(PredictError::LabelsUnavailable(kind))?;
    if top_k == 0 { return Err(PredictError::InvalidTopK); }

    let tensor = preprocess(image)?;
    debug!(model=%kind, shape=?tensor.dim(), "image preprocessed");

    let started = Instant::now();
    let scores = model.forward(tensor).map_err(PredictError::Inference)?;
    metrics::observe_inference(kind.selector(), started.elapsed());
    if let Some(idx) = scores.iter().position(|s| !s.is_finite()) {
        warn!(model=%kind, index = idx, score = scores[idx], "model produced a non-finite score");
        return Err(PredictError::NonFiniteScores(kind));
    }

    let probs = softmax_percent(&scores);
    if probs.len() != labels.len() {
        warn!(model=%kind, outputs=probs.len(), labels=labels.len(), "model output size does not match label count");
        metrics::record_label_mismatch(kind.selector());
    }

    let mut ranked = Vec::with_capacity(top_k);
    for (rank, idx) in top_k_indices(&probs, top_k).into_iter().enumerate() {
        match labels.get(idx) {
            Some(label) => ranked.push(RankedLabel { letter: label.clone(), confidence: probs[idx] }),
            None => warn!(model=%kind, rank = rank + 1, index = idx, max = labels.len().saturating_sub(1), "prediction index out of label range; skipped"),
        }
    }
    let top = ranked.first().cloned().ok_or(PredictError::NoValidPrediction(kind))?;
    info!(model=%kind, prediction=%top.letter, confidence=top.confidence, "prediction complete");

    Ok(PredictionResult {
        prediction: top.letter,
        confidence: top.confidence,
        all_predictions: ranked,
        model_used: kind.selector().to_string(),
        total_classes: labels.len(),
    })
}
