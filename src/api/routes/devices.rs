//! Device management endpoints

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::info;

use crate::{
    Device,
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
    },
    registry::Admission,
};

/// GET /devices
///
/// All known devices in insertion order
pub async fn list_devices(State(state): State<ApiState>) -> Json<Vec<Device>> {
    Json(state.registry.list().await)
}

/// POST /devices
///
/// `201` with the new entry, or `200` with the existing one when the instance
/// is already known. The existing entry is never overwritten here.
pub async fn add_device(
    State(state): State<ApiState>,
    body: Result<Json<Device>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Device>)> {
    let Json(device) = body?;

    match state.registry.add(device.clone()).await {
        Admission::Added => {
            info!("device {} added through API", device.instance);
            Ok((StatusCode::CREATED, Json(device)))
        }
        Admission::AlreadyKnown => {
            let existing = state
                .registry
                .get(&device.instance)
                .await
                .ok_or_else(|| ApiError::Internal(format!("device {} vanished", device.instance)))?;
            Ok((StatusCode::OK, Json(existing)))
        }
        Admission::MissingHost => Err(ApiError::InvalidRequest(format!(
            "device {} has no host",
            device.instance
        ))),
        Admission::MissingInstance => Err(ApiError::InvalidRequest(
            "device instance is required".to_string(),
        )),
        Admission::MissingPort => Err(ApiError::InvalidRequest(format!(
            "device {} has no port",
            device.instance
        ))),
    }
}

/// PUT /devices/{instance}
///
/// Replace a known device. An empty body instance takes the path's.
pub async fn update_device(
    State(state): State<ApiState>,
    Path(instance): Path<String>,
    body: Result<Json<Device>, JsonRejection>,
) -> ApiResult<Json<Device>> {
    let Json(mut device) = body?;

    if device.instance.is_empty() {
        device.instance = instance.clone();
    } else if device.instance != instance {
        return Err(ApiError::InvalidRequest(format!(
            "instance {} in body does not match {instance}",
            device.instance
        )));
    }

    state.registry.update(device.clone()).await?;
    info!("device {} updated through API", device.instance);

    Ok(Json(device))
}
