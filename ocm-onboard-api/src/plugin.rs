//! Plugin capability surface
//!
//! A host discovers what the plugin offers through [`PluginMetadata`], drives its
//! lifecycle through [`Plugin`] and mounts the routers it returns.

use async_trait::async_trait;
use axum::Router;
use ocm_onboard_common::PluginHealth;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::PluginConfig;
use crate::{handlers, websocket};
use crate::health::{find_executable, HealthChecker, ToolRequirement};
use crate::kubernetes::KubeconfigResolver;
use crate::ocm::orchestrator::OrchestratorSettings;
use crate::ocm::{ClusteradmCli, KubectlCli, OcmAdapters, Orchestrator, WorkflowTracker};
use crate::state::AppState;
use crate::store::ClusterStore;

pub const PLUGIN_ID: &str = "kubestellar-cluster-plugin";
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub handler: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl EndpointInfo {
    fn new(path: &str, method: &str, handler: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            handler: handler.to_string(),
            description: description.to_string(),
        }
    }
}

/// What the plugin is and what it needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
    pub permissions: Vec<String>,
    pub dependencies: Vec<String>,
    pub configuration: BTreeMap<String, serde_json::Value>,
}

impl PluginMetadata {
    pub fn for_config(config: &PluginConfig) -> Self {
        let endpoints = vec![
            EndpointInfo::new("/onboard", "POST", "onboard_cluster", "Start onboarding a cluster"),
            EndpointInfo::new("/detach", "POST", "detach_cluster", "Start detaching a cluster"),
            EndpointInfo::new("/status", "GET", "cluster_status", "Status and events of one cluster"),
            EndpointInfo::new("/status/:cluster", "GET", "cluster_status_by_path", ""),
            EndpointInfo::new("/list", "GET", "list_clusters", "All tracked clusters"),
            EndpointInfo::new("/clusters", "GET", "list_clusters", ""),
            EndpointInfo::new("/events/:cluster", "GET", "cluster_events", "Event log of one cluster"),
            EndpointInfo::new("/logs/:cluster", "GET", "cluster_events", ""),
            EndpointInfo::new("/workflows", "GET", "list_workflows", "Recent workflow runs"),
            EndpointInfo::new("/health", "GET", "health_check", "Plugin health"),
            EndpointInfo::new("/metadata", "GET", "plugin_metadata", ""),
        ];

        let mut configuration = BTreeMap::new();
        configuration.insert("its_context".to_string(), config.ocm.its_context.clone().into());
        configuration.insert(
            "kubeconfig_dir".to_string(),
            config.paths.kubeconfig_dir.display().to_string().into(),
        );
        configuration.insert(
            "csr_settle_delay_secs".to_string(),
            config.ocm.csr_settle_delay_secs.into(),
        );
        configuration.insert("log_level".to_string(), config.logging.level.clone().into());

        Self {
            id: PLUGIN_ID.to_string(),
            name: "KubeStellar Cluster Management".to_string(),
            version: PLUGIN_VERSION.to_string(),
            description: "Cluster onboarding and detachment for KubeStellar/OCM hubs".to_string(),
            endpoints,
            permissions: ["cluster.read", "cluster.write", "cluster.delete", "configmap.read", "configmap.write"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            dependencies: vec![config.ocm.kubectl_bin.clone(), config.ocm.clusteradm_bin.clone()],
            configuration,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("plugin already initialized")]
    AlreadyInitialized,

    #[error("plugin not initialized")]
    NotInitialized,
}

/// Lifecycle and routing contract between a plugin and its host
#[async_trait]
pub trait Plugin: Send + Sync {
    fn metadata(&self) -> &PluginMetadata;

    /// Prepare local resources; a second call fails
    async fn initialize(&self) -> Result<(), PluginError>;

    /// HTTP routes, relative to the plugin's API prefix
    fn router(&self) -> Router;

    /// WebSocket routes, relative to the plugin's WebSocket prefix
    fn ws_router(&self) -> Router;

    async fn health(&self) -> Result<PluginHealth, PluginError>;

    /// Stop accepting work and let running workflows finish
    async fn cleanup(&self) -> Result<(), PluginError>;
}

/// Cluster onboarding plugin
pub struct ClusterPlugin {
    state: Arc<AppState>,
    config: PluginConfig,
}

impl ClusterPlugin {
    /// Plugin backed by the configured `kubectl`/`clusteradm`
    pub fn new(config: PluginConfig) -> Self {
        let adapters = OcmAdapters::from_cli(
            ClusteradmCli::new(&config.ocm.clusteradm_bin, &config.ocm.its_context),
            KubectlCli::new(&config.ocm.kubectl_bin, &config.ocm.its_context),
        );
        Self::with_adapters(config, adapters)
    }

    pub fn with_adapters(config: PluginConfig, adapters: OcmAdapters) -> Self {
        let store = Arc::new(ClusterStore::new());
        let tracker = Arc::new(WorkflowTracker::new(store.clone()));
        let orchestrator = Arc::new(Orchestrator::new(
            store.clone(),
            tracker.clone(),
            adapters,
            OrchestratorSettings {
                kubeconfig_dir: config.paths.kubeconfig_dir.clone(),
                csr_settle_delay: config.ocm.csr_settle_delay(),
            },
        ));

        let tools = vec![
            ToolRequirement {
                name: "kubectl".to_string(),
                binary: config.ocm.kubectl_bin.clone(),
            },
            ToolRequirement {
                name: "clusteradm".to_string(),
                binary: config.ocm.clusteradm_bin.clone(),
            },
        ];

        let state = Arc::new(AppState {
            store,
            orchestrator,
            tracker,
            resolver: Arc::new(KubeconfigResolver::new(config.paths.source_kubeconfig.clone())),
            endpoints: Arc::new(config.endpoints.clone()),
            health: Arc::new(HealthChecker::new(
                PLUGIN_VERSION,
                tools,
                config.paths.kubeconfig_dir.clone(),
            )),
            metadata: Arc::new(PluginMetadata::for_config(&config)),
            initialized: Arc::new(AtomicBool::new(false)),
        });

        Self { state, config }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Both routers nested under their configured prefixes
    pub fn app(&self) -> Router {
        Router::new()
            .nest(&self.config.endpoints.api_base, self.router())
            .nest(&self.config.endpoints.ws_base, self.ws_router())
    }
}

#[async_trait]
impl Plugin for ClusterPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.state.metadata
    }

    async fn initialize(&self) -> Result<(), PluginError> {
        if self
            .state
            .initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PluginError::AlreadyInitialized);
        }

        let dir = &self.config.paths.kubeconfig_dir;
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(path = %dir.display(), "Failed to create kubeconfig directory: {}", e);
        }

        for binary in [&self.config.ocm.kubectl_bin, &self.config.ocm.clusteradm_bin] {
            if find_executable(binary).is_none() {
                warn!(tool = %binary, "Required tool not available in PATH");
            }
        }

        info!(
            plugin = PLUGIN_ID,
            version = PLUGIN_VERSION,
            its_context = %self.config.ocm.its_context,
            "Plugin initialized"
        );
        Ok(())
    }

    fn router(&self) -> Router {
        handlers::router(self.state.clone())
    }

    fn ws_router(&self) -> Router {
        websocket::router(self.state.clone())
    }

    async fn health(&self) -> Result<PluginHealth, PluginError> {
        if !self.state.is_initialized() {
            return Err(PluginError::NotInitialized);
        }
        Ok(self.state.health.build_response(true))
    }

    async fn cleanup(&self) -> Result<(), PluginError> {
        self.state.initialized.store(false, Ordering::SeqCst);

        let timeout = Duration::from_secs(self.config.server.shutdown_timeout_secs);
        if !self.state.tracker.wait_all(timeout).await {
            warn!(
                "{} workflow(s) still running after {:?}",
                self.state.tracker.running_count().await,
                timeout
            );
        }

        info!(plugin = PLUGIN_ID, "Plugin cleaned up");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &std::path::Path) -> PluginConfig {
        let mut config = PluginConfig::default();
        config.paths.kubeconfig_dir = dir.join("clusters");
        config.server.shutdown_timeout_secs = 1;
        config
    }

    #[tokio::test]
    async fn test_initialize_once() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = ClusterPlugin::new(test_config(dir.path()));

        assert!(matches!(plugin.health().await, Err(PluginError::NotInitialized)));

        plugin.initialize().await.unwrap();
        assert!(dir.path().join("clusters").is_dir());
        assert!(plugin.health().await.unwrap().initialized);

        assert!(matches!(
            plugin.initialize().await,
            Err(PluginError::AlreadyInitialized)
        ));
    }

    #[tokio::test]
    async fn test_cleanup_marks_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = ClusterPlugin::new(test_config(dir.path()));
        plugin.initialize().await.unwrap();

        plugin.cleanup().await.unwrap();
        assert!(!plugin.state().is_initialized());
        assert!(plugin.health().await.is_err());
    }

    #[test]
    fn test_metadata() {
        let metadata = PluginMetadata::for_config(&PluginConfig::default());
        assert_eq!(metadata.id, "kubestellar-cluster-plugin");
        assert_eq!(metadata.dependencies, vec!["kubectl", "clusteradm"]);
        assert!(metadata.endpoints.iter().any(|e| e.path == "/onboard" && e.method == "POST"));
        assert_eq!(metadata.configuration["its_context"], "its1");
    }
}
