//! Local kubeconfig resolution
//!
//! Extracts a standalone, single-context kubeconfig for one cluster out of a
//! multi-context kubeconfig file, using kube's kubeconfig model so extensions
//! and exec plugin settings carry over.

use kube::config::{Context, Kubeconfig, NamedContext};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::{OnboardError, OnboardResult};

pub fn parse_kubeconfig(yaml: &str) -> OnboardResult<Kubeconfig> {
    Kubeconfig::from_yaml(yaml)
        .map_err(|e| OnboardError::Validation(format!("Failed to parse kubeconfig: {}", e)))
}

pub fn render_kubeconfig(kubeconfig: &Kubeconfig) -> OnboardResult<String> {
    serde_yaml::to_string(kubeconfig)
        .map_err(|e| OnboardError::Internal(format!("Failed to render kubeconfig: {}", e)))
}

/// Build a kubeconfig holding only what `cluster_name` needs
pub fn extract_cluster(kubeconfig: &Kubeconfig, cluster_name: &str) -> OnboardResult<Kubeconfig> {
    let (named_context, context) = find_context(kubeconfig, cluster_name)?;

    let cluster = kubeconfig
        .clusters
        .iter()
        .find(|c| c.name == context.cluster)
        .ok_or_else(|| {
            OnboardError::NotFound(format!(
                "cluster '{}' referenced by context '{}' not found in kubeconfig",
                context.cluster, named_context.name
            ))
        })?;

    let user_name = context.user.as_deref().ok_or_else(|| {
        OnboardError::NotFound(format!("context '{}' has no user", named_context.name))
    })?;

    let user = kubeconfig
        .auth_infos
        .iter()
        .find(|u| u.name == user_name)
        .ok_or_else(|| {
            OnboardError::NotFound(format!(
                "user '{}' referenced by context '{}' not found in kubeconfig",
                user_name, named_context.name
            ))
        })?;

    Ok(Kubeconfig {
        api_version: Some(kubeconfig.api_version.clone().unwrap_or_else(|| "v1".to_string())),
        kind: Some(kubeconfig.kind.clone().unwrap_or_else(|| "Config".to_string())),
        clusters: vec![cluster.clone()],
        auth_infos: vec![user.clone()],
        contexts: vec![named_context.clone()],
        current_context: Some(named_context.name.clone()),
        ..Default::default()
    })
}

/// Context for `cluster_name`: one referencing a cluster entry of that name,
/// else one whose cluster field is that name, else one named that way.
fn find_context<'a>(
    kubeconfig: &'a Kubeconfig,
    cluster_name: &str,
) -> OnboardResult<(&'a NamedContext, &'a Context)> {
    let with_body = move || {
        kubeconfig
            .contexts
            .iter()
            .filter_map(|named| named.context.as_ref().map(|context| (named, context)))
    };
    let by_cluster = with_body().find(|(_, context)| context.cluster == cluster_name);

    if kubeconfig.clusters.iter().any(|c| c.name == cluster_name) {
        return by_cluster.ok_or_else(|| {
            OnboardError::NotFound(format!("no context references cluster '{}'", cluster_name))
        });
    }

    by_cluster
        .or_else(|| with_body().find(|(named, _)| named.name == cluster_name))
        .ok_or_else(|| {
            OnboardError::NotFound(format!(
                "cluster or context '{}' not found in kubeconfig",
                cluster_name
            ))
        })
}

/// Locates the local kubeconfig and extracts per-cluster kubeconfigs from it
#[derive(Debug, Clone, Default)]
pub struct KubeconfigResolver {
    path_override: Option<PathBuf>,
}

impl KubeconfigResolver {
    pub fn new(path_override: Option<PathBuf>) -> Self {
        Self { path_override }
    }

    /// Configured path, else `KUBECONFIG` (first entry), else `$HOME/.kube/config`
    pub fn kubeconfig_path(&self) -> OnboardResult<PathBuf> {
        if let Some(path) = &self.path_override {
            return Ok(path.clone());
        }

        if let Some(value) = std::env::var_os("KUBECONFIG") {
            if let Some(first) = std::env::split_paths(&value).find(|p| !p.as_os_str().is_empty())
            {
                return Ok(first);
            }
        }

        std::env::var_os("HOME")
            .map(|home| Path::new(&home).join(".kube").join("config"))
            .ok_or_else(|| {
                OnboardError::NotFound("neither KUBECONFIG nor HOME is set".to_string())
            })
    }

    /// Standalone kubeconfig YAML for `cluster_name`
    pub async fn resolve(&self, cluster_name: &str) -> OnboardResult<Vec<u8>> {
        let path = self.kubeconfig_path()?;
        debug!(cluster = %cluster_name, path = %path.display(), "Resolving kubeconfig from local context");

        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
            OnboardError::NotFound(format!(
                "failed to read kubeconfig {}: {}",
                path.display(),
                e
            ))
        })?;

        let extracted = extract_cluster(&parse_kubeconfig(&raw)?, cluster_name)?;
        Ok(render_kubeconfig(&extracted)?.into_bytes())
    }
}
