//! Scrape endpoint

use axum::{extract::State, http::header, response::IntoResponse};

use crate::api::state::ApiState;
use crate::exposition::CONTENT_TYPE;

/// GET /metrics
///
/// Four lines per device that has a reading. Devices never sampled
/// successfully are absent rather than zero.
pub async fn scrape(State(state): State<ApiState>) -> impl IntoResponse {
    let body = state.observations.render().await;
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body)
}
