//! Application State
//!
//! Shared state handed to every plugin handler

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::EndpointsConfig;
use crate::health::HealthChecker;
use crate::kubernetes::KubeconfigResolver;
use crate::ocm::{Orchestrator, WorkflowTracker};
use crate::plugin::PluginMetadata;
use crate::store::ClusterStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ClusterStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub tracker: Arc<WorkflowTracker>,
    pub resolver: Arc<KubeconfigResolver>,
    pub endpoints: Arc<EndpointsConfig>,
    pub health: Arc<HealthChecker>,
    pub metadata: Arc<PluginMetadata>,
    pub initialized: Arc<AtomicBool>,
}

impl AppState {
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}
