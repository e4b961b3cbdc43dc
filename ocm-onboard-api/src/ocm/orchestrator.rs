//! Onboarding and detachment workflows
//!
//! Every step is reported to the cluster's event log as it happens. The coarse
//! cluster status only changes at the start (`Pending`/`Detaching`, set by the
//! `start_*` entry points) and at the end of a workflow.

use ocm_onboard_common::{ClusterStatus, EventPhase};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::tasks::{WorkflowKind, WorkflowTracker};
use super::OcmAdapters;
use crate::kubernetes::{OnboardError, OnboardResult};
use crate::store::ClusterStore;

/// Tunables for the workflows
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Where per-attempt kubeconfig files are written
    pub kubeconfig_dir: PathBuf,
    /// Pause between joining and looking for the cluster's CSRs
    pub csr_settle_delay: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            kubeconfig_dir: PathBuf::from("/tmp/kubestellar-clusters"),
            csr_settle_delay: Duration::from_secs(5),
        }
    }
}

/// Drives clusters onto and off the hub
pub struct Orchestrator {
    store: Arc<ClusterStore>,
    tracker: Arc<WorkflowTracker>,
    adapters: OcmAdapters,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        store: Arc<ClusterStore>,
        tracker: Arc<WorkflowTracker>,
        adapters: OcmAdapters,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            tracker,
            adapters,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<ClusterStore> {
        &self.store
    }

    pub fn tracker(&self) -> &Arc<WorkflowTracker> {
        &self.tracker
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Claim `name` and launch its onboarding in the background.
    ///
    /// Returns the existing status, without starting anything, if the cluster
    /// is already tracked.
    pub async fn start_onboarding(
        self: &Arc<Self>,
        name: &str,
        kubeconfig: Vec<u8>,
    ) -> Result<(), ClusterStatus> {
        self.store.try_begin_onboarding(name).await?;

        self.store.clear_events(name).await;
        self.store
            .log(
                name,
                EventPhase::Initiated,
                "Onboarding process initiated by plugin API request",
            )
            .await;

        let this = self.clone();
        let cluster = name.to_string();
        self.tracker
            .spawn(WorkflowKind::Onboarding, name, async move {
                this.run_onboarding(&cluster, &kubeconfig).await
            })
            .await;

        Ok(())
    }

    /// Mark `name` as detaching and launch its removal in the background.
    ///
    /// Returns the current status, without starting anything, while another
    /// workflow is still running for the cluster.
    pub async fn start_detachment(
        self: &Arc<Self>,
        name: &str,
        force: bool,
    ) -> Result<(), ClusterStatus> {
        match self.store.status(name).await {
            Some(status) => info!(cluster = %name, %status, force, "Detaching tracked cluster"),
            None => info!(cluster = %name, force, "Cluster not tracked locally, checking hub"),
        }
        self.store.try_begin_detachment(name).await?;

        let this = self.clone();
        let cluster = name.to_string();
        self.tracker
            .spawn(WorkflowKind::Detachment, name, async move {
                this.run_detachment(&cluster, force).await
            })
            .await;

        Ok(())
    }

    /// Onboard and record the final status
    pub async fn run_onboarding(&self, name: &str, kubeconfig: &[u8]) -> OnboardResult<()> {
        let result = self.onboard(name, kubeconfig).await;
        let status = if result.is_ok() {
            ClusterStatus::Onboarded
        } else {
            ClusterStatus::Failed
        };
        self.store.set(name, status).await;
        info!(cluster = %name, %status, "Onboarding finished");
        result
    }

    /// Detach and record the final status; success forgets the cluster
    pub async fn run_detachment(&self, name: &str, force: bool) -> OnboardResult<()> {
        let result = self.detach(name, force).await;
        match &result {
            Ok(()) => {
                self.store.delete(name).await;
                info!(cluster = %name, "Cluster detached");
            }
            Err(_) => {
                self.store.set(name, ClusterStatus::DetachmentFailed).await;
                info!(cluster = %name, "Detachment failed");
            }
        }
        result
    }

    // =========================================================================
    // Workflows
    // =========================================================================

    /// Join `name` to the hub using `kubeconfig`
    pub async fn onboard(&self, name: &str, kubeconfig: &[u8]) -> OnboardResult<()> {
        self.log(name, EventPhase::Starting, "Beginning cluster onboarding process")
            .await;

        self.log(name, EventPhase::Validating, "Validating cluster connectivity")
            .await;
        match self.adapters.validator.validate(kubeconfig).await {
            Ok(version) => {
                self.log(
                    name,
                    EventPhase::Validated,
                    format!("Cluster connectivity validated successfully (server {})", version),
                )
                .await
            }
            Err(e) => {
                return Err(self
                    .fail(name, "Cluster connectivity validation failed", e)
                    .await)
            }
        }

        self.log(name, EventPhase::Preparing, "Preparing cluster configuration")
            .await;
        // Removed from disk when dropped, whichever way this attempt ends
        let temp_kubeconfig = match self.write_temp_kubeconfig(name, kubeconfig) {
            Ok(file) => file,
            Err(e) => {
                return Err(self
                    .fail(name, "Failed to save temporary kubeconfig", e)
                    .await)
            }
        };

        self.log(
            name,
            EventPhase::GeneratingToken,
            "Generating clusteradm join token from ITS hub",
        )
        .await;
        let join_command = match self.adapters.tokens.join_command().await {
            Ok(command) => command,
            Err(e) => return Err(self.fail(name, "Failed to generate join token", e).await),
        };
        self.log(name, EventPhase::TokenGenerated, "Join token generated successfully")
            .await;

        self.log(
            name,
            EventPhase::Joining,
            "Joining cluster to OCM hub using clusteradm",
        )
        .await;
        match self
            .adapters
            .joiner
            .join(&join_command, name, temp_kubeconfig.path())
            .await
        {
            Ok(output) => debug!(cluster = %name, "clusteradm join output: {}", output.trim()),
            Err(e) => return Err(self.fail(name, "Failed to join cluster to hub", e).await),
        }
        self.log(name, EventPhase::Joined, "Cluster joined to OCM hub successfully")
            .await;

        self.log(
            name,
            EventPhase::ApprovingCsr,
            "Waiting for and approving Certificate Signing Request",
        )
        .await;
        if !self.settings.csr_settle_delay.is_zero() {
            tokio::time::sleep(self.settings.csr_settle_delay).await;
        }
        match self.adapters.csr.approve_for(name).await {
            Ok(approved) => {
                self.log(
                    name,
                    EventPhase::CsrApproved,
                    format!(
                        "Certificate Signing Request approved successfully ({} approved)",
                        approved.len()
                    ),
                )
                .await
            }
            Err(e) => {
                self.warn(
                    name,
                    format!("CSR approval failed, but cluster may still work: {}", e),
                    &e,
                )
                .await
            }
        }

        self.log(name, EventPhase::Verifying, "Verifying cluster is properly managed")
            .await;
        if let Err(e) = self.adapters.checker.verify_available(name).await {
            return Err(self.fail(name, "Cluster verification failed", e).await);
        }

        drop(temp_kubeconfig);
        self.log(
            name,
            EventPhase::Success,
            "Cluster onboarded successfully to KubeStellar",
        )
        .await;
        Ok(())
    }

    /// Remove `name` from the hub. With `force`, a missing or undeletable
    /// managed cluster does not stop local cleanup.
    pub async fn detach(&self, name: &str, force: bool) -> OnboardResult<()> {
        self.log(name, EventPhase::Detaching, "Starting cluster detachment process")
            .await;

        self.log(name, EventPhase::Checking, "Checking cluster status in OCM hub")
            .await;
        if !self.adapters.checker.exists(name).await {
            let err = OnboardError::NotFound(format!("cluster {} not found in OCM hub", name));
            if !force {
                self.warn(name, "Cluster not found in OCM hub", &err).await;
                return Err(err);
            }
            self.warn(
                name,
                "Cluster not found in OCM hub, continuing because force is set",
                &err,
            )
            .await;
        }

        self.log(name, EventPhase::Removing, "Removing cluster from OCM hub")
            .await;
        if let Err(e) = self.adapters.remover.remove(name).await {
            if !force {
                return Err(self.fail(name, "Failed to remove cluster from hub", e).await);
            }
            self.warn(
                name,
                format!("Ignoring removal failure because force is set: {}", e),
                &e,
            )
            .await;
        }
        self.log(name, EventPhase::Removed, "Cluster removed from OCM hub")
            .await;

        self.log(name, EventPhase::Cleanup, "Cleaning up local resources")
            .await;
        if let Err(e) = self.cleanup_local(name) {
            self.warn(
                name,
                format!("Failed to clean up some local resources: {}", e),
                &e,
            )
            .await;
        }

        self.log(
            name,
            EventPhase::Success,
            "Cluster detached successfully from KubeStellar",
        )
        .await;
        Ok(())
    }

    // =========================================================================
    // Local artifacts
    // =========================================================================

    /// Path of the kubeconfig written for `name` during an attempt
    pub fn temp_kubeconfig_path(&self, name: &str) -> PathBuf {
        self.settings
            .kubeconfig_dir
            .join(format!("{}-kubeconfig.yaml", name))
    }

    fn write_temp_kubeconfig(&self, name: &str, kubeconfig: &[u8]) -> OnboardResult<NamedTempFile> {
        let dir = &self.settings.kubeconfig_dir;
        std::fs::create_dir_all(dir)?;

        // A leftover from a crashed attempt would block the exclusive create
        remove_if_present(&self.temp_kubeconfig_path(name))?;

        let mut file = tempfile::Builder::new()
            .prefix(&format!("{}-kubeconfig", name))
            .suffix(".yaml")
            .rand_bytes(0)
            .tempfile_in(dir)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(kubeconfig)?;
        file.flush()?;
        debug!(cluster = %name, path = %file.path().display(), "Wrote temporary kubeconfig");
        Ok(file)
    }

    fn cleanup_local(&self, name: &str) -> OnboardResult<()> {
        remove_if_present(&self.temp_kubeconfig_path(name))
            .map_err(|e| OnboardError::Cleanup(format!("failed to remove temporary kubeconfig: {}", e)))
    }

    // =========================================================================
    // Event helpers
    // =========================================================================

    async fn log(&self, name: &str, phase: EventPhase, message: impl Into<String>) {
        self.store.log(name, phase, message).await;
    }

    async fn warn(&self, name: &str, message: impl Into<String>, err: &OnboardError) {
        self.store
            .log_with_reason(name, EventPhase::Warning, message, err.kind())
            .await;
    }

    /// Record a fatal step failure and hand the error back
    async fn fail(&self, name: &str, context: &str, err: OnboardError) -> OnboardError {
        self.store
            .log_with_reason(
                name,
                EventPhase::Error,
                format!("{}: {}", context, err),
                err.kind(),
            )
            .await;
        err
    }
}

fn remove_if_present(path: &Path) -> OnboardResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
