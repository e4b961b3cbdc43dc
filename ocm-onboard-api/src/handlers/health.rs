use axum::{extract::State, Json};
use ocm_onboard_common::PluginHealth;
use std::sync::Arc;

use crate::plugin::PluginMetadata;
use crate::state::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<PluginHealth> {
    Json(state.health.build_response(state.is_initialized()))
}

pub async fn plugin_metadata(State(state): State<Arc<AppState>>) -> Json<PluginMetadata> {
    Json(state.metadata.as_ref().clone())
}
