//! Common types shared between ocm-onboard-api and ocm-onboard-cli

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

/// Longest cluster name accepted (DNS subdomain limit)
pub const MAX_CLUSTER_NAME_LEN: usize = 253;

/// Coarse lifecycle state of a cluster as tracked by the plugin
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ClusterStatus {
    Pending,
    Onboarded,
    Failed,
    Detaching,
    DetachmentFailed,
}

impl ClusterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterStatus::Pending => "Pending",
            ClusterStatus::Onboarded => "Onboarded",
            ClusterStatus::Failed => "Failed",
            ClusterStatus::Detaching => "Detaching",
            ClusterStatus::DetachmentFailed => "DetachmentFailed",
        }
    }

    /// A workflow is still running for the cluster
    pub fn is_in_flight(&self) -> bool {
        matches!(self, ClusterStatus::Pending | ClusterStatus::Detaching)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ClusterStatus::Failed | ClusterStatus::DetachmentFailed)
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusterStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(ClusterStatus::Pending),
            "Onboarded" => Ok(ClusterStatus::Onboarded),
            "Failed" => Ok(ClusterStatus::Failed),
            "Detaching" => Ok(ClusterStatus::Detaching),
            "DetachmentFailed" => Ok(ClusterStatus::DetachmentFailed),
            other => Err(Error::Validation(format!("unknown cluster status '{}'", other))),
        }
    }
}

/// Phase label recorded on each event.
///
/// Finer grained than [`ClusterStatus`]: one onboarding walks through a dozen
/// phases while the cluster stays `Pending`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventPhase {
    Initiated,
    Starting,
    Validating,
    Validated,
    Preparing,
    GeneratingToken,
    TokenGenerated,
    Joining,
    Joined,
    #[serde(rename = "ApprovingCSR")]
    ApprovingCsr,
    #[serde(rename = "CSRApproved")]
    CsrApproved,
    Verifying,
    Detaching,
    Checking,
    Removing,
    Removed,
    Cleanup,
    Warning,
    Error,
    Success,
}

impl EventPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventPhase::Initiated => "Initiated",
            EventPhase::Starting => "Starting",
            EventPhase::Validating => "Validating",
            EventPhase::Validated => "Validated",
            EventPhase::Preparing => "Preparing",
            EventPhase::GeneratingToken => "GeneratingToken",
            EventPhase::TokenGenerated => "TokenGenerated",
            EventPhase::Joining => "Joining",
            EventPhase::Joined => "Joined",
            EventPhase::ApprovingCsr => "ApprovingCSR",
            EventPhase::CsrApproved => "CSRApproved",
            EventPhase::Verifying => "Verifying",
            EventPhase::Detaching => "Detaching",
            EventPhase::Checking => "Checking",
            EventPhase::Removing => "Removing",
            EventPhase::Removed => "Removed",
            EventPhase::Cleanup => "Cleanup",
            EventPhase::Warning => "Warning",
            EventPhase::Error => "Error",
            EventPhase::Success => "Success",
        }
    }
}

impl fmt::Display for EventPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a cluster's onboarding/detachment history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingEvent {
    pub timestamp: DateTime<Utc>,
    pub cluster_name: String,
    pub status: EventPhase,
    pub message: String,
    /// Error taxonomy tag for `Error`/`Warning` events (e.g. `ConnectivityError`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl OnboardingEvent {
    pub fn new(cluster_name: impl Into<String>, status: EventPhase, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            cluster_name: cluster_name.into(),
            status,
            message: message.into(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Onboarding request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterOnboardRequest {
    #[serde(default, alias = "clusterName")]
    pub name: String,
    /// Inline kubeconfig; empty or absent means "resolve from the local kubeconfig"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub cluster_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ClusterOnboardRequest {
    /// Inline kubeconfig, if one was supplied and is not blank
    pub fn inline_kubeconfig(&self) -> Option<&str> {
        self.kubeconfig
            .as_deref()
            .filter(|k| !k.trim().is_empty())
    }
}

/// Detachment request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterDetachRequest {
    #[serde(default, alias = "clusterName")]
    pub name: String,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub cleanup: bool,
    #[serde(default)]
    pub backup: bool,
}

/// Immediate reply to an onboarding or detachment request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationAck {
    pub message: String,
    pub status: ClusterStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub websocket_endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    pub name: String,
    pub status: ClusterStatus,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterStatusResponse {
    pub cluster: ClusterSummary,
    pub events: Vec<OnboardingEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterListResponse {
    pub clusters: Vec<ClusterSummary>,
    pub total: usize,
    pub connected: usize,
    pub disconnected: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterEventsResponse {
    pub cluster_name: String,
    pub events: Vec<OnboardingEvent>,
    pub count: usize,
}

/// Health of a single dependency
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
}

/// `/health` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginHealth {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub initialized: bool,
    /// Seconds since the plugin process started
    #[serde(default)]
    pub uptime_seconds: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentHealth>,
}

/// Shared error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("System error: {0}")]
    System(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// DNS-1123 subdomain, the shape a ManagedCluster name must have
static CLUSTER_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").unwrap()
});

/// Reject names that are not valid managed cluster names.
///
/// Names end up in `kubectl` argument lists, file names and URLs, so anything
/// outside lowercase alphanumerics, `-` and `.` is refused.
pub fn validate_cluster_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation("cluster name is required".to_string()));
    }
    if name.len() > MAX_CLUSTER_NAME_LEN {
        return Err(Error::Validation(format!(
            "cluster name exceeds {} characters",
            MAX_CLUSTER_NAME_LEN
        )));
    }
    if !CLUSTER_NAME_REGEX.is_match(name) {
        return Err(Error::Validation(format!(
            "cluster name '{}' must be lowercase alphanumerics, '-' or '.', starting and ending with an alphanumeric",
            name
        )));
    }
    Ok(())
}
