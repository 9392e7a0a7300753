use super::ApiError;
use crate::encoder::{decode_image, encode};
use crate::server::SharedState;
use axum::{body::Bytes, extract::State, Json};
use serde_json::{json, Value};
use std::time::Instant;
use tracing::instrument;

/// Uploaded image in, raw inference output out, as nested numeric
/// sequences. The output schema is whatever the backend sent; nothing is
/// validated or interpreted here.
#[instrument(skip(state, image_data))]
pub async fn predict(
    State(state): State<SharedState>,
    image_data: Bytes,
) -> Result<Json<Value>, ApiError> {
    let image = decode_image(&image_data)?;
    let input = encode(&image);

    let started = Instant::now();
    let output = state.gateway.infer(input).await?;
    state
        .metrics
        .record_inference_duration(started.elapsed().as_millis() as u64, "/predict");
    state.metrics.record_request("/predict");

    Ok(Json(json!({ "output": output.to_json() })))
}
