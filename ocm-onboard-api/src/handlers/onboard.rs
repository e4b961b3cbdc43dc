//! Onboarding requests
//!
//! Three request shapes are accepted: a multipart upload (`name` plus an optional
//! `kubeconfig` file), a JSON body, or a bare `?name=` query. Anything that does
//! not carry kubeconfig bytes is resolved from the local kubeconfig before the
//! workflow starts, so resolution failures reach the caller directly.

use axum::{
    extract::{FromRequest, Multipart, Query, Request, State},
    http::header::CONTENT_TYPE,
    Json,
};
use ocm_onboard_common::{validate_cluster_name, ClusterOnboardRequest, ClusterStatus, OperationAck};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OnboardQuery {
    #[serde(default, alias = "clusterName")]
    pub name: Option<String>,
}

/// Name plus kubeconfig bytes, if the request carried any
#[derive(Debug, Default)]
struct OnboardInput {
    name: String,
    kubeconfig: Option<Vec<u8>>,
}

pub async fn onboard_cluster(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<OperationAck>, ApiError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    let input = if content_type.starts_with("multipart/form-data") {
        read_multipart(request, &state).await?
    } else if content_type.contains("application/json") {
        read_json(request, &state).await?
    } else {
        read_query(&request)?
    };

    validate_cluster_name(&input.name)?;
    let name = input.name;

    let kubeconfig = match input.kubeconfig {
        Some(bytes) => bytes,
        None => state.resolver.resolve(&name).await.map_err(|e| {
            warn!(cluster = %name, "Local kubeconfig resolution failed: {}", e);
            ApiError::BadRequest(format!(
                "Failed to find cluster '{}' in local kubeconfig: {}",
                name, e
            ))
        })?,
    };

    match state.orchestrator.start_onboarding(&name, kubeconfig).await {
        Ok(()) => {
            info!(cluster = %name, "Onboarding accepted");
            Ok(Json(OperationAck {
                message: format!("Cluster '{}' is being onboarded", name),
                status: ClusterStatus::Pending,
                logs_endpoint: Some(state.endpoints.logs_endpoint(&name)),
                websocket_endpoint: Some(state.endpoints.onboarding_ws_endpoint(&name)),
            }))
        }
        Err(existing) => {
            info!(cluster = %name, status = %existing, "Onboarding skipped, cluster already tracked");
            Ok(Json(OperationAck {
                message: format!(
                    "Cluster '{}' is already onboarded (status: {})",
                    name, existing
                ),
                status: existing,
                logs_endpoint: None,
                websocket_endpoint: None,
            }))
        }
    }
}

async fn read_multipart(request: Request, state: &Arc<AppState>) -> Result<OnboardInput, ApiError> {
    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?;

    let mut input = OnboardInput::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("name") | Some("clusterName") => {
                input.name = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read name: {}", e)))?
                    .trim()
                    .to_string();
            }
            Some("kubeconfig") => {
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read kubeconfig file: {}", e))
                })?;
                if !bytes.is_empty() {
                    input.kubeconfig = Some(bytes.to_vec());
                }
            }
            _ => {}
        }
    }

    if input.name.is_empty() {
        return Err(ApiError::missing_field("Cluster name"));
    }
    Ok(input)
}

async fn read_json(request: Request, state: &Arc<AppState>) -> Result<OnboardInput, ApiError> {
    let Json(body) = Json::<ClusterOnboardRequest>::from_request(request, state)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid request payload: {}", e)))?;

    if body.name.trim().is_empty() {
        return Err(ApiError::missing_field("ClusterName"));
    }

    Ok(OnboardInput {
        kubeconfig: body.inline_kubeconfig().map(|k| k.as_bytes().to_vec()),
        name: body.name,
    })
}

fn read_query(request: &Request) -> Result<OnboardInput, ApiError> {
    let Query(query) = Query::<OnboardQuery>::try_from_uri(request.uri())
        .map_err(|e| ApiError::BadRequest(format!("Invalid query: {}", e)))?;

    match query.name.filter(|n| !n.trim().is_empty()) {
        Some(name) => Ok(OnboardInput {
            name,
            kubeconfig: None,
        }),
        None => Err(ApiError::missing_field("Cluster name parameter")),
    }
}
