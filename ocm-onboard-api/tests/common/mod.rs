//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use ocm_onboard_api::config::PluginConfig;
use ocm_onboard_api::kubernetes::{OnboardError, OnboardResult};
use ocm_onboard_api::ocm::orchestrator::OrchestratorSettings;
use ocm_onboard_api::ocm::{
    ClusterJoiner, ConnectivityValidator, CsrApprover, JoinCommand, JoinTokenProvider,
    ManagedClusterChecker, ManagedClusterRemover, OcmAdapters, Orchestrator, WorkflowTracker,
};
use ocm_onboard_api::store::ClusterStore;
use ocm_onboard_api::ClusterPlugin;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub const SAMPLE_KUBECONFIG: &str = r#"apiVersion: v1
kind: Config
clusters:
- name: prod-1
  cluster:
    server: https://10.0.0.5:6443
users:
- name: prod-admin
  user:
    token: abc
contexts:
- name: prod-1
  context:
    cluster: prod-1
    user: prod-admin
current-context: prod-1
"#;

/// What the joiner observed about the kubeconfig it was handed
#[derive(Debug, Clone)]
pub struct JoinObservation {
    pub cluster: String,
    pub path: PathBuf,
    pub contents: String,
    pub mode: u32,
    pub args: Vec<String>,
}

/// In-memory stand-in for the hub and the cluster being joined
#[derive(Default)]
pub struct FakeHub {
    pub fail_connectivity: AtomicBool,
    pub fail_token: AtomicBool,
    pub fail_join: AtomicBool,
    pub fail_csr: AtomicBool,
    pub fail_verify: AtomicBool,
    pub fail_remove: AtomicBool,
    /// Joins block until `release` is notified
    pub hold_join: AtomicBool,
    pub release: Notify,

    pub registered: Mutex<HashSet<String>>,
    pub joins: Mutex<Vec<JoinObservation>>,
    pub token_calls: AtomicUsize,
    pub csr_calls: AtomicUsize,
    pub remove_calls: AtomicUsize,
}

impl FakeHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }

    pub fn register(&self, name: &str) {
        self.registered.lock().unwrap().insert(name.to_string());
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registered.lock().unwrap().contains(name)
    }

    pub fn last_join(&self) -> Option<JoinObservation> {
        self.joins.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ConnectivityValidator for FakeHub {
    async fn validate(&self, kubeconfig: &[u8]) -> OnboardResult<String> {
        if self.fail_connectivity.load(Ordering::SeqCst) {
            return Err(OnboardError::Connectivity(
                "connection refused".to_string(),
            ));
        }
        if kubeconfig.is_empty() {
            return Err(OnboardError::Connectivity("empty kubeconfig".to_string()));
        }
        Ok("v1.32.0".to_string())
    }
}

#[async_trait]
impl JoinTokenProvider for FakeHub {
    async fn join_command(&self) -> OnboardResult<JoinCommand> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_token.load(Ordering::SeqCst) {
            return Err(OnboardError::TokenGeneration(
                "context its1 not found".to_string(),
            ));
        }
        JoinCommand::parse_from_output(
            "token=abc\nclusteradm join --hub-token abc --hub-apiserver https://hub:6443 --cluster-name <cluster_name>\n",
        )
    }
}

#[async_trait]
impl ClusterJoiner for FakeHub {
    async fn join(
        &self,
        command: &JoinCommand,
        cluster_name: &str,
        kubeconfig_path: &Path,
    ) -> OnboardResult<String> {
        let contents = std::fs::read_to_string(kubeconfig_path).unwrap_or_default();
        let mode = file_mode(kubeconfig_path);
        self.joins.lock().unwrap().push(JoinObservation {
            cluster: cluster_name.to_string(),
            path: kubeconfig_path.to_path_buf(),
            contents,
            mode,
            args: command.with_target(cluster_name, &kubeconfig_path.display().to_string()),
        });

        if self.hold_join.load(Ordering::SeqCst) {
            self.release.notified().await;
        }

        if self.fail_join.load(Ordering::SeqCst) {
            return Err(OnboardError::Join {
                message: "clusteradm join exited with status 1".to_string(),
                output: "error: unable to reach hub".to_string(),
            });
        }

        self.register(cluster_name);
        Ok("joined".to_string())
    }
}

#[async_trait]
impl CsrApprover for FakeHub {
    async fn approve_for(&self, cluster_name: &str) -> OnboardResult<Vec<String>> {
        self.csr_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_csr.load(Ordering::SeqCst) {
            return Err(OnboardError::CsrApproval("no CSRs found".to_string()));
        }
        Ok(vec![format!("csr-{}-abcde", cluster_name)])
    }
}

#[async_trait]
impl ManagedClusterChecker for FakeHub {
    async fn exists(&self, cluster_name: &str) -> bool {
        self.is_registered(cluster_name)
    }

    async fn verify_available(&self, cluster_name: &str) -> OnboardResult<()> {
        if self.fail_verify.load(Ordering::SeqCst) || !self.is_registered(cluster_name) {
            return Err(OnboardError::Verification(format!(
                "managed cluster {} is not available",
                cluster_name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ManagedClusterRemover for FakeHub {
    async fn remove(&self, cluster_name: &str) -> OnboardResult<()> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(OnboardError::Removal(format!(
                "managedclusters.cluster.open-cluster-management.io \"{}\" is forbidden",
                cluster_name
            )));
        }
        self.registered.lock().unwrap().remove(cluster_name);
        Ok(())
    }
}

pub fn adapters(hub: &Arc<FakeHub>) -> OcmAdapters {
    OcmAdapters {
        validator: hub.clone(),
        tokens: hub.clone(),
        joiner: hub.clone(),
        csr: hub.clone(),
        checker: hub.clone(),
        remover: hub.clone(),
    }
}

/// Orchestrator over the fake hub, writing kubeconfigs under `dir`
pub fn orchestrator(hub: &Arc<FakeHub>, dir: &Path) -> Arc<Orchestrator> {
    let store = Arc::new(ClusterStore::new());
    let tracker = Arc::new(WorkflowTracker::new(store.clone()));
    Arc::new(Orchestrator::new(
        store,
        tracker,
        adapters(hub),
        OrchestratorSettings {
            kubeconfig_dir: dir.to_path_buf(),
            csr_settle_delay: Duration::ZERO,
        },
    ))
}

pub fn test_config(dir: &Path) -> PluginConfig {
    let mut config = PluginConfig::default();
    config.paths.kubeconfig_dir = dir.join("clusters");
    config.ocm.csr_settle_delay_secs = 0;
    config.server.shutdown_timeout_secs = 5;
    config
}

pub fn test_plugin(hub: &Arc<FakeHub>, config: PluginConfig) -> ClusterPlugin {
    ClusterPlugin::with_adapters(config, adapters(hub))
}

#[cfg(unix)]
fn file_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o777)
        .unwrap_or(0)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> u32 {
    0o600
}
