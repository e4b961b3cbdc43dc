//! Cluster status store and event log
//!
//! Both live behind a single reader/writer lock so a status transition and the
//! event describing it can be observed together. Nothing here is persisted: the
//! store lives as long as the plugin that owns it.

use chrono::{DateTime, Utc};
use ocm_onboard_common::{ClusterStatus, EventPhase, OnboardingEvent};
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

/// Capacity of the live event channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Current status of one cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRecord {
    pub status: ClusterStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct StoreInner {
    statuses: HashMap<String, ClusterRecord>,
    events: HashMap<String, Vec<OnboardingEvent>>,
}

/// Shared cluster state: per-name status plus ordered event history
pub struct ClusterStore {
    inner: RwLock<StoreInner>,
    events_tx: broadcast::Sender<OnboardingEvent>,
}

impl ClusterStore {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: RwLock::new(StoreInner::default()),
            events_tx,
        }
    }

    // =========================================================================
    // Status
    // =========================================================================

    pub async fn get(&self, name: &str) -> Option<ClusterRecord> {
        self.inner.read().await.statuses.get(name).cloned()
    }

    pub async fn status(&self, name: &str) -> Option<ClusterStatus> {
        self.get(name).await.map(|r| r.status)
    }

    pub async fn set(&self, name: &str, status: ClusterStatus) {
        let mut inner = self.inner.write().await;
        inner.statuses.insert(
            name.to_string(),
            ClusterRecord {
                status,
                updated_at: Utc::now(),
            },
        );
    }

    /// Remove a cluster's status. Its event history is kept so the outcome of a
    /// detachment can still be read.
    pub async fn delete(&self, name: &str) -> Option<ClusterRecord> {
        self.inner.write().await.statuses.remove(name)
    }

    /// All clusters, sorted by name
    pub async fn list(&self) -> Vec<(String, ClusterRecord)> {
        let inner = self.inner.read().await;
        let mut clusters: Vec<_> = inner
            .statuses
            .iter()
            .map(|(name, record)| (name.clone(), record.clone()))
            .collect();
        clusters.sort_by(|a, b| a.0.cmp(&b.0));
        clusters
    }

    /// Atomically claim `name` for a new onboarding attempt.
    ///
    /// Returns the existing status when the name is already tracked, in which
    /// case nothing is changed.
    pub async fn try_begin_onboarding(&self, name: &str) -> Result<(), ClusterStatus> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.statuses.get(name) {
            return Err(existing.status);
        }
        inner.statuses.insert(
            name.to_string(),
            ClusterRecord {
                status: ClusterStatus::Pending,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Atomically move `name` to `Detaching`.
    ///
    /// Refused with the current status while an onboarding or detachment is
    /// still running for the cluster. Untracked clusters are claimed too so a
    /// hub-only cluster can still be removed.
    pub async fn try_begin_detachment(&self, name: &str) -> Result<(), ClusterStatus> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.statuses.get(name) {
            if existing.status.is_in_flight() {
                return Err(existing.status);
            }
        }
        inner.statuses.insert(
            name.to_string(),
            ClusterRecord {
                status: ClusterStatus::Detaching,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    // =========================================================================
    // Event log
    // =========================================================================

    /// Append an event to the cluster's history and publish it to live subscribers
    pub async fn append_event(&self, event: OnboardingEvent) {
        match event.status {
            EventPhase::Error | EventPhase::Warning => warn!(
                cluster = %event.cluster_name,
                phase = %event.status,
                reason = event.reason.as_deref().unwrap_or(""),
                "{}",
                event.message
            ),
            _ => info!(cluster = %event.cluster_name, phase = %event.status, "{}", event.message),
        }

        {
            let mut inner = self.inner.write().await;
            inner
                .events
                .entry(event.cluster_name.clone())
                .or_default()
                .push(event.clone());
        }

        // No receivers is the common case
        let _ = self.events_tx.send(event);
    }

    pub async fn log(&self, name: &str, phase: EventPhase, message: impl Into<String>) {
        self.append_event(OnboardingEvent::new(name, phase, message)).await;
    }

    pub async fn log_with_reason(
        &self,
        name: &str,
        phase: EventPhase,
        message: impl Into<String>,
        reason: &str,
    ) {
        self.append_event(OnboardingEvent::new(name, phase, message).with_reason(reason))
            .await;
    }

    /// Reset a cluster's history to empty
    pub async fn clear_events(&self, name: &str) {
        let mut inner = self.inner.write().await;
        inner.events.insert(name.to_string(), Vec::new());
    }

    pub async fn events(&self, name: &str) -> Vec<OnboardingEvent> {
        self.inner
            .read()
            .await
            .events
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Status and events read under one lock acquisition
    pub async fn snapshot(&self, name: &str) -> Option<(ClusterRecord, Vec<OnboardingEvent>)> {
        let inner = self.inner.read().await;
        let record = inner.statuses.get(name)?.clone();
        let events = inner.events.get(name).cloned().unwrap_or_default();
        Some((record, events))
    }

    /// Subscribe to every event appended from now on
    pub fn subscribe(&self) -> broadcast::Receiver<OnboardingEvent> {
        self.events_tx.subscribe()
    }
}

impl Default for ClusterStore {
    fn default() -> Self {
        Self::new()
    }
}
