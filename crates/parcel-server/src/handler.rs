use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use parcel_protocol::{AppListResponse, HealthResponse, RegisterAppRequest};
use parcel_store::{AppRegistration, NodeStore};
use parcel_sync::AnnouncementScheduler;
use parcel_types::RootHash;
use tracing::info;

use crate::error::ApiError;

/// Shared by every handler of both listeners.
#[derive(Clone)]
pub struct NodeState {
    pub store: Arc<dyn NodeStore>,
    pub scheduler: AnnouncementScheduler,
}

fn unprocessable(rejection: JsonRejection) -> ApiError {
    ApiError::Unprocessable(rejection.body_text())
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// `POST /notify`: accept an announcement and resolve it in the background.
pub async fn notify(
    State(state): State<NodeState>,
    body: Result<Json<RootHash>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(root) = body.map_err(unprocessable)?;
    info!(key = %root.key(), "received announcement");
    let _ = state.scheduler.schedule(root);
    Ok(StatusCode::OK)
}

/// `POST /api/v1/registerApp`
pub async fn register_app(
    State(state): State<NodeState>,
    body: Result<Json<RegisterAppRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AppRegistration>), ApiError> {
    let Json(req) = body.map_err(unprocessable)?;
    if req.address.trim().is_empty() {
        return Err(ApiError::Unprocessable("address must not be empty".into()));
    }

    let registration = state.store.register_app(&req.address, &req.name)?;
    info!(
        id = registration.id,
        address = %registration.address,
        name = %registration.name,
        "registered app"
    );
    Ok((StatusCode::CREATED, Json(registration)))
}

/// `GET /api/v1/apps`
pub async fn list_apps(State(state): State<NodeState>) -> Result<Json<AppListResponse>, ApiError> {
    let addresses = state.store.list_registered_apps()?;
    Ok(Json(AppListResponse { addresses }))
}
