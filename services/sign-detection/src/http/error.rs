use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

use crate::labels::ModelKind;
use crate::predict::{ErrorClass, PredictError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Predict(#[from] PredictError),
    #[error("{} detection model not available", .kind.describe())]
    ModelNotLoaded { kind: ModelKind, available: Vec<String> },
    #[error("multipart form is missing the 'file' field")]
    MissingFile,
    #[error("invalid multipart payload: {0}")]
    Multipart(#[from] MultipartError),
    #[error("inference timed out after {0:?}")]
    Timeout(Duration),
    #[error("inference worker failed: {0}")]
    Worker(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Predict(e) => match e.class() {
                ErrorClass::ClientInput => StatusCode::BAD_REQUEST,
                ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::ModelNotLoaded { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::MissingFile => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn available_models(&self) -> Option<&[String]> {
        match self {
            ApiError::Predict(PredictError::ModelUnavailable { available, .. }) => Some(available.as_slice()),
            ApiError::ModelNotLoaded { available, .. } => Some(available.as_slice()),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() { error!(error=%self, "detect failed"); } else { warn!(error=%self, "detect rejected"); }
        let body = match self.available_models() {
            Some(available) => json!({"error": self.to_string(), "available_models": available}),
            None => json!({"error": self.to_string()}),
        };
        (status, Json(body)).into_response()
    }
}
