mod health;
mod metrics;
mod predict;
mod predict_image;

use crate::detection::MalformedDetection;
use crate::encoder::EncodeError;
use crate::gateway::InferenceError;
use crate::server::SharedState;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use thiserror::Error;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health::healthcheck))
        .route("/predict", post(predict::predict))
        .route("/predict/image", post(predict_image::predict_image))
        .route("/metrics", get(metrics::metrics_handler))
}

/// Everything a request can fail with, classified by kind. The caller
/// always gets an `{"error": ...}` body; the kind drives the status code
/// and the log line instead of one generic message.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Encode(#[from] EncodeError),
    #[error("inference request failed: {0}")]
    Inference(#[from] InferenceError),
    #[error("{0}")]
    Detection(#[from] MalformedDetection),
    #[error("failed to encode response image: {0}")]
    ImageWrite(image::ImageError),
    #[error("HTTP builder failed: {0}")]
    HttpBuilder(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Encode(_) => StatusCode::BAD_REQUEST,
            ApiError::Inference(_) | ApiError::Detection(_) => StatusCode::BAD_GATEWAY,
            ApiError::ImageWrite(_) | ApiError::HttpBuilder(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Encode(EncodeError::Decode(_)) => "decode",
            ApiError::Encode(EncodeError::UnsupportedMode(_)) => "unsupported_mode",
            ApiError::Inference(_) => "inference",
            ApiError::Detection(_) => "malformed_detection",
            ApiError::ImageWrite(_) => "image_write",
            ApiError::HttpBuilder(_) => "http_builder",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(kind = self.kind(), "request failed: {}", self);
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
