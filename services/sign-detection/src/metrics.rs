use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec, IntCounterVec, IntGauge};
use std::time::Duration;

static PREDICTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("isyarat_predictions_total", "Detect requests by model and outcome", &["model", "outcome"])
        .expect("register isyarat_predictions_total")
});

static INFERENCE_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "isyarat_inference_latency_ms",
        "Forward pass latency per model (ms)",
        &["model"],
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .expect("register isyarat_inference_latency_ms")
});

static LABEL_MISMATCH_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("isyarat_label_mismatch_total", "Forward passes whose output width differs from the label count", &["model"])
        .expect("register isyarat_label_mismatch_total")
});

static MODELS_LOADED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("isyarat_models_loaded", "Models present in the registry").expect("register isyarat_models_loaded")
});

pub fn record_prediction(model: &str, outcome: &str) { PREDICTIONS_TOTAL.with_label_values(&[model, outcome]).inc(); }

pub fn observe_inference(model: &str, elapsed: Duration) {
    INFERENCE_LATENCY_MS.with_label_values(&[model]).observe(elapsed.as_secs_f64() * 1000.0);
}

pub fn record_label_mismatch(model: &str) { LABEL_MISMATCH_TOTAL.with_label_values(&[model]).inc(); }

#[cfg(test)]
pub(crate) fn label_mismatch_count(model: &str) -> u64 { LABEL_MISMATCH_TOTAL.with_label_values(&[model]).get() }

pub fn set_models_loaded(count: usize) { MODELS_LOADED.set(count as i64); }
