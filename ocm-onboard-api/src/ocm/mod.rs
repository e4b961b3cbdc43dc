//! Open Cluster Management hub operations
//!
//! The orchestrator only sees the narrow traits below. Production code backs them
//! with `kubectl`/`clusteradm` processes ([`cli`]) and a kube-rs connectivity probe;
//! tests swap in in-memory fakes.

pub mod cli;
pub mod join;
pub mod orchestrator;
pub mod tasks;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::kubernetes::{KubeConnectivityValidator, OnboardResult};

pub use cli::{ClusteradmCli, CommandRunner, KubectlCli};
pub use join::JoinCommand;
pub use orchestrator::Orchestrator;
pub use tasks::{WorkflowKind, WorkflowRecord, WorkflowState, WorkflowTracker};

/// Confirms a kubeconfig reaches a live API server
#[async_trait]
pub trait ConnectivityValidator: Send + Sync {
    /// Returns the server's reported version
    async fn validate(&self, kubeconfig: &[u8]) -> OnboardResult<String>;
}

/// Issues hub join commands
#[async_trait]
pub trait JoinTokenProvider: Send + Sync {
    async fn join_command(&self) -> OnboardResult<JoinCommand>;
}

/// Runs a join command against the cluster being onboarded
#[async_trait]
pub trait ClusterJoiner: Send + Sync {
    /// Returns the combined output of the join
    async fn join(
        &self,
        command: &JoinCommand,
        cluster_name: &str,
        kubeconfig_path: &Path,
    ) -> OnboardResult<String>;
}

/// Approves the certificate signing requests a joining cluster raises
#[async_trait]
pub trait CsrApprover: Send + Sync {
    /// Approves every pending CSR whose name mentions `cluster_name`, returning
    /// the names approved
    async fn approve_for(&self, cluster_name: &str) -> OnboardResult<Vec<String>>;
}

/// Reads managed cluster state from the hub
#[async_trait]
pub trait ManagedClusterChecker: Send + Sync {
    /// Lookup failures count as absent
    async fn exists(&self, cluster_name: &str) -> bool;

    /// Succeeds only when the cluster is registered and reports available
    async fn verify_available(&self, cluster_name: &str) -> OnboardResult<()>;
}

/// Deletes managed clusters from the hub
#[async_trait]
pub trait ManagedClusterRemover: Send + Sync {
    async fn remove(&self, cluster_name: &str) -> OnboardResult<()>;
}

/// Everything the orchestrator needs to reach the outside world
#[derive(Clone)]
pub struct OcmAdapters {
    pub validator: Arc<dyn ConnectivityValidator>,
    pub tokens: Arc<dyn JoinTokenProvider>,
    pub joiner: Arc<dyn ClusterJoiner>,
    pub csr: Arc<dyn CsrApprover>,
    pub checker: Arc<dyn ManagedClusterChecker>,
    pub remover: Arc<dyn ManagedClusterRemover>,
}

impl OcmAdapters {
    /// Adapters backed by the real binaries, all pointed at the hub context
    pub fn from_cli(clusteradm: ClusteradmCli, kubectl: KubectlCli) -> Self {
        let clusteradm = Arc::new(clusteradm);
        let kubectl = Arc::new(kubectl);
        Self {
            validator: Arc::new(KubeConnectivityValidator::new()),
            tokens: clusteradm.clone(),
            joiner: clusteradm,
            csr: kubectl.clone(),
            checker: kubectl.clone(),
            remover: kubectl,
        }
    }
}
