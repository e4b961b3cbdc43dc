//! HTTP handlers for the plugin API

pub mod clusters;
pub mod detach;
pub mod health;
pub mod onboard;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::state::AppState;

/// Plugin routes, relative to the API prefix
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/onboard", post(onboard::onboard_cluster))
        .route("/detach", post(detach::detach_cluster))
        .route("/status", get(clusters::cluster_status))
        .route("/status/:cluster", get(clusters::cluster_status_by_path))
        .route("/list", get(clusters::list_clusters))
        .route("/clusters", get(clusters::list_clusters))
        .route("/events/:cluster", get(clusters::cluster_events))
        .route("/logs/:cluster", get(clusters::cluster_events))
        .route("/workflows", get(clusters::list_workflows))
        .route("/health", get(health::health_check))
        .route("/metadata", get(health::plugin_metadata))
        .with_state(state)
}
