//! Workflow tracking
//!
//! Each onboarding or detachment runs as its own tokio task. The tracker keeps a
//! record per run plus its join handle, so callers can wait for a cluster's
//! workflow to finish and a panicking workflow still leaves the cluster in a
//! failure state instead of stuck in `Pending`/`Detaching`.

use chrono::{DateTime, Utc};
use ocm_onboard_common::{ClusterStatus, EventPhase};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::kubernetes::OnboardResult;
use crate::store::ClusterStore;

const DEFAULT_MAX_HISTORY: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowKind {
    Onboarding,
    Detachment,
}

impl WorkflowKind {
    /// Cluster status left behind when a workflow of this kind dies
    pub fn failure_status(&self) -> ClusterStatus {
        match self {
            WorkflowKind::Onboarding => ClusterStatus::Failed,
            WorkflowKind::Detachment => ClusterStatus::DetachmentFailed,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    Running,
    Succeeded,
    Failed,
    Panicked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRecord {
    pub id: String,
    pub cluster: String,
    pub kind: WorkflowKind,
    pub state: WorkflowState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct TrackedHandle {
    cluster: String,
    handle: JoinHandle<()>,
}

/// Spawns workflows and remembers how they ended
pub struct WorkflowTracker {
    store: Arc<ClusterStore>,
    records: Arc<RwLock<HashMap<String, WorkflowRecord>>>,
    handles: Mutex<HashMap<String, TrackedHandle>>,
    max_history: usize,
}

impl WorkflowTracker {
    pub fn new(store: Arc<ClusterStore>) -> Self {
        Self::with_history(store, DEFAULT_MAX_HISTORY)
    }

    pub fn with_history(store: Arc<ClusterStore>, max_history: usize) -> Self {
        Self {
            store,
            records: Arc::new(RwLock::new(HashMap::new())),
            handles: Mutex::new(HashMap::new()),
            max_history,
        }
    }

    /// Run `workflow` in the background and return its record id
    pub async fn spawn<F>(&self, kind: WorkflowKind, cluster: &str, workflow: F) -> String
    where
        F: Future<Output = OnboardResult<()>> + Send + 'static,
    {
        let id = Uuid::new_v4().to_string();
        let record = WorkflowRecord {
            id: id.clone(),
            cluster: cluster.to_string(),
            kind,
            state: WorkflowState::Running,
            started_at: Utc::now(),
            finished_at: None,
            error: None,
        };
        self.records.write().await.insert(id.clone(), record);

        let inner = tokio::spawn(workflow);

        let records = self.records.clone();
        let store = self.store.clone();
        let max_history = self.max_history;
        let cluster_name = cluster.to_string();
        let record_id = id.clone();

        let supervisor = tokio::spawn(async move {
            let (state, error) = match inner.await {
                Ok(Ok(())) => (WorkflowState::Succeeded, None),
                Ok(Err(e)) => (WorkflowState::Failed, Some(e.to_string())),
                Err(join_err) if join_err.is_panic() => {
                    error!(cluster = %cluster_name, ?kind, "Workflow panicked");
                    store.set(&cluster_name, kind.failure_status()).await;
                    store
                        .log_with_reason(
                            &cluster_name,
                            EventPhase::Error,
                            "Workflow terminated unexpectedly",
                            "InternalError",
                        )
                        .await;
                    (WorkflowState::Panicked, Some("workflow panicked".to_string()))
                }
                Err(join_err) => {
                    warn!(cluster = %cluster_name, ?kind, "Workflow aborted: {}", join_err);
                    store.set(&cluster_name, kind.failure_status()).await;
                    (WorkflowState::Failed, Some(join_err.to_string()))
                }
            };

            let mut records = records.write().await;
            if let Some(record) = records.get_mut(&record_id) {
                record.state = state;
                record.error = error;
                record.finished_at = Some(Utc::now());
            }
            prune_history(&mut records, max_history);
            debug!(cluster = %cluster_name, ?state, "Workflow finished");
        });

        let mut handles = self.handles.lock().await;
        handles.retain(|_, tracked| !tracked.handle.is_finished());
        handles.insert(
            id.clone(),
            TrackedHandle {
                cluster: cluster.to_string(),
                handle: supervisor,
            },
        );

        info!(cluster = %cluster, ?kind, workflow_id = %id, "Workflow started");
        id
    }

    /// Wait for every workflow currently tracked for `cluster`
    pub async fn wait(&self, cluster: &str) {
        let pending: Vec<JoinHandle<()>> = {
            let mut handles = self.handles.lock().await;
            let ids: Vec<String> = handles
                .iter()
                .filter(|(_, tracked)| tracked.cluster == cluster)
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter()
                .filter_map(|id| handles.remove(id))
                .map(|tracked| tracked.handle)
                .collect()
        };

        for handle in pending {
            let _ = handle.await;
        }
    }

    /// Wait for all tracked workflows, giving up after `timeout`.
    ///
    /// Returns false if some were still running when time ran out.
    pub async fn wait_all(&self, timeout: Duration) -> bool {
        let pending: Vec<JoinHandle<()>> = {
            let mut handles = self.handles.lock().await;
            handles.drain().map(|(_, tracked)| tracked.handle).collect()
        };

        if pending.is_empty() {
            return true;
        }

        info!("Waiting for {} workflow(s) to finish", pending.len());
        tokio::time::timeout(timeout, futures::future::join_all(pending))
            .await
            .is_ok()
    }

    pub async fn get(&self, id: &str) -> Option<WorkflowRecord> {
        self.records.read().await.get(id).cloned()
    }

    /// Most recent first
    pub async fn list(&self) -> Vec<WorkflowRecord> {
        let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        records
    }

    pub async fn running_count(&self) -> usize {
        self.records
            .read()
            .await
            .values()
            .filter(|r| r.state == WorkflowState::Running)
            .count()
    }
}

/// Drop the oldest finished records beyond `max_history`
fn prune_history(records: &mut HashMap<String, WorkflowRecord>, max_history: usize) {
    let mut finished: Vec<(String, DateTime<Utc>)> = records
        .values()
        .filter(|r| r.state != WorkflowState::Running)
        .map(|r| (r.id.clone(), r.finished_at.unwrap_or(r.started_at)))
        .collect();

    if finished.len() <= max_history {
        return;
    }

    finished.sort_by(|a, b| a.1.cmp(&b.1));
    let excess = finished.len() - max_history;
    for (id, _) in finished.into_iter().take(excess) {
        records.remove(&id);
    }
}
