//! Core shared plumbing for TemanIsyarat services: tracing, configuration,
//! liveness/readiness state and Prometheus exposition.

use anyhow::Result;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use once_cell::sync::OnceCell;
use prometheus::{Encoder, TextEncoder};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod settings;
pub use settings::{load_config, CONFIG_FILE_ENV, ENV_PREFIX};

static TRACING_INIT: OnceCell<()> = OnceCell::new();
static NODE_LIVENESS: AtomicBool = AtomicBool::new(true);
static NODE_READINESS: AtomicBool = AtomicBool::new(false);

pub const JSON_LOG_ENV: &str = "ISYARAT_JSON_LOG";

pub fn mark_ready() { NODE_READINESS.store(true, Ordering::SeqCst); }
pub fn clear_ready() { NODE_READINESS.store(false, Ordering::SeqCst); }
pub fn is_ready() -> bool { NODE_READINESS.load(Ordering::SeqCst) }
pub fn is_live() -> bool { NODE_LIVENESS.load(Ordering::SeqCst) }

/// Installs the global subscriber once per process. `RUST_LOG` drives the
/// filter (default `info`); `ISYARAT_JSON_LOG=1` switches to JSON lines.
pub fn init_tracing(service: &str) -> Result<()> {
    TRACING_INIT.get_or_try_init(|| -> Result<()> {
        let json = std::env::var(JSON_LOG_ENV).ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(env_filter);
        if json {
            registry
                .with(tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(false))
                .try_init()?;
        } else {
            registry
                .with(tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(true))
                .try_init()?;
        }
        Ok(())
    })?;
    info!(service, "tracing initialized");
    Ok(())
}

/// Liveness, readiness and metrics routes, merged into a service router.
pub fn health_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/live", get(live_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
}

async fn live_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"live": is_live()}))
}

async fn ready_handler() -> Response {
    let ready = is_ready();
    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(serde_json::json!({"ready": ready}))).into_response()
}

pub async fn metrics_handler() -> Response {
    let metric_families = prometheus::gather();
    let mut buf = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&metric_families, &mut buf) {
        return (StatusCode::INTERNAL_SERVER_ERROR, format!("encode error: {e}")).into_response();
    }
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], buf).into_response()
}

/// Resolves on Ctrl-C (or SIGTERM on unix) and clears readiness first so
/// probes stop routing traffic while in-flight requests drain.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await { tracing::warn!(error=?e, "ctrl_c handler failed"); }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => { sig.recv().await; }
            Err(e) => { tracing::warn!(error=?e, "sigterm handler failed"); std::future::pending::<()>().await; }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    clear_ready();
    info!("shutdown signal received");
}
