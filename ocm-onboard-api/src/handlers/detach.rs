//! Detachment requests

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use ocm_onboard_common::{validate_cluster_name, ClusterDetachRequest, ClusterStatus, OperationAck};
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn detach_cluster(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ClusterDetachRequest>, JsonRejection>,
) -> Result<Json<OperationAck>, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::BadRequest(format!("Invalid request format: {}", e)))?;

    validate_cluster_name(&request.name)?;
    let name = request.name;

    info!(
        cluster = %name,
        force = request.force,
        cleanup = request.cleanup,
        backup = request.backup,
        "Detachment requested"
    );

    match state.orchestrator.start_detachment(&name, request.force).await {
        Ok(()) => Ok(Json(OperationAck {
            message: format!("Cluster '{}' is being detached", name),
            status: ClusterStatus::Detaching,
            logs_endpoint: Some(state.endpoints.logs_endpoint(&name)),
            websocket_endpoint: Some(state.endpoints.detachment_ws_endpoint(&name)),
        })),
        Err(existing) => {
            info!(cluster = %name, status = %existing, "Detachment skipped, workflow in progress");
            Ok(Json(OperationAck {
                message: format!(
                    "Cluster '{}' has a workflow in progress (status: {})",
                    name, existing
                ),
                status: existing,
                logs_endpoint: None,
                websocket_endpoint: None,
            }))
        }
    }
}
