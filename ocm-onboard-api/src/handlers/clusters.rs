//! Read-only cluster views: status, list, event log, workflow history

use axum::{
    extract::{Path, Query, State},
    Json,
};
use ocm_onboard_common::{
    ClusterEventsResponse, ClusterListResponse, ClusterStatus, ClusterStatusResponse,
    ClusterSummary,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiError;
use crate::ocm::WorkflowRecord;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default, alias = "cluster")]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkflowListResponse {
    pub workflows: Vec<WorkflowRecord>,
    pub total: usize,
}

pub async fn cluster_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<ClusterStatusResponse>, ApiError> {
    let name = query
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::missing_field("cluster name"))?;

    status_response(&state, &name).await
}

pub async fn cluster_status_by_path(
    State(state): State<Arc<AppState>>,
    Path(cluster): Path<String>,
) -> Result<Json<ClusterStatusResponse>, ApiError> {
    status_response(&state, &cluster).await
}

async fn status_response(
    state: &AppState,
    name: &str,
) -> Result<Json<ClusterStatusResponse>, ApiError> {
    let (record, events) = state
        .store
        .snapshot(name)
        .await
        .ok_or_else(|| ApiError::cluster_not_found(name))?;

    Ok(Json(ClusterStatusResponse {
        cluster: ClusterSummary {
            name: name.to_string(),
            status: record.status,
            last_seen: record.updated_at,
        },
        events,
    }))
}

pub async fn list_clusters(State(state): State<Arc<AppState>>) -> Json<ClusterListResponse> {
    let clusters: Vec<ClusterSummary> = state
        .store
        .list()
        .await
        .into_iter()
        .map(|(name, record)| ClusterSummary {
            name,
            status: record.status,
            last_seen: record.updated_at,
        })
        .collect();

    let connected = clusters
        .iter()
        .filter(|c| c.status == ClusterStatus::Onboarded)
        .count();
    let disconnected = clusters.iter().filter(|c| c.status.is_failure()).count();

    Json(ClusterListResponse {
        total: clusters.len(),
        connected,
        disconnected,
        clusters,
    })
}

pub async fn cluster_events(
    State(state): State<Arc<AppState>>,
    Path(cluster): Path<String>,
) -> Json<ClusterEventsResponse> {
    let events = state.store.events(&cluster).await;
    Json(ClusterEventsResponse {
        count: events.len(),
        cluster_name: cluster,
        events,
    })
}

pub async fn list_workflows(State(state): State<Arc<AppState>>) -> Json<WorkflowListResponse> {
    let workflows = state.tracker.list().await;
    Json(WorkflowListResponse {
        total: workflows.len(),
        workflows,
    })
}
