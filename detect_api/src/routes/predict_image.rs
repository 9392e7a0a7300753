use super::ApiError;
use crate::detection::Detection;
use crate::encoder::{decode_image, encode};
use crate::overlay::draw_detections;
use crate::server::SharedState;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::header,
    response::Response,
};
use std::io::Cursor;
use std::time::Instant;
use tracing::instrument;

/// Same pipeline as `/predict`, but renders the detections onto the
/// uploaded image and answers with JPEG.
///
/// Detections arrive in the 640x640 model input space and are drawn onto
/// the original-resolution image as-is, without rescaling; see DESIGN.md
/// for why this mismatch is kept.
#[instrument(skip(state, image_data))]
pub async fn predict_image(
    State(state): State<SharedState>,
    image_data: Bytes,
) -> Result<Response, ApiError> {
    let image = decode_image(&image_data)?;
    let input = encode(&image);

    let started = Instant::now();
    let output = state.gateway.infer(input).await?;
    state
        .metrics
        .record_inference_duration(started.elapsed().as_millis() as u64, "/predict/image");
    state.metrics.record_request("/predict/image");

    let detections = output
        .rows()
        .map(Detection::from_row)
        .collect::<Result<Vec<_>, _>>()?;

    let annotated = draw_detections(image.into_rgb8(), &detections);

    let mut body = Vec::new();
    annotated
        .write_to(&mut Cursor::new(&mut body), image::ImageFormat::Jpeg)
        .map_err(ApiError::ImageWrite)?;

    let response = Response::builder()
        .header(header::CONTENT_TYPE, "image/jpeg")
        .body(Body::from(body))
        .map_err(|e| ApiError::HttpBuilder(e.to_string()))?;

    Ok(response)
}
