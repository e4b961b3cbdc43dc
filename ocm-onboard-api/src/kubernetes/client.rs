//! API server connectivity checks
//!
//! Builds a kube-rs client from raw kubeconfig bytes and asks the server for its
//! version. This is the only place the plugin talks to a Kubernetes API directly;
//! everything hub-side goes through `kubectl`/`clusteradm`.

use async_trait::async_trait;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use super::error::{OnboardError, OnboardResult};
use crate::ocm::ConnectivityValidator;

/// Validates kubeconfigs against the API server they point at
#[derive(Debug, Clone, Default)]
pub struct KubeConnectivityValidator;

impl KubeConnectivityValidator {
    pub fn new() -> Self {
        Self
    }

    /// Parse kubeconfig bytes and build a client for its current context
    pub async fn client_from_kubeconfig(kubeconfig: &[u8]) -> OnboardResult<Client> {
        let yaml = std::str::from_utf8(kubeconfig).map_err(|e| {
            OnboardError::Connectivity(format!("kubeconfig is not valid UTF-8: {}", e))
        })?;

        let kubeconfig = Kubeconfig::from_yaml(yaml).map_err(|e| {
            OnboardError::Connectivity(format!("Failed to parse kubeconfig: {}", e))
        })?;

        if kubeconfig.current_context.is_none() && kubeconfig.contexts.len() != 1 {
            return Err(OnboardError::Connectivity(
                "kubeconfig has no current-context".to_string(),
            ));
        }

        // A single context without current-context is still unambiguous
        let context = kubeconfig
            .current_context
            .clone()
            .or_else(|| kubeconfig.contexts.first().map(|c| c.name.clone()));

        let config = Config::from_custom_kubeconfig(
            kubeconfig,
            &KubeConfigOptions {
                context,
                ..Default::default()
            },
        )
        .await
        .map_err(|e| OnboardError::Connectivity(format!("Failed to create config: {}", e)))?;

        Client::try_from(config)
            .map_err(|e| OnboardError::Connectivity(format!("Failed to create client: {}", e)))
    }
}

#[async_trait]
impl ConnectivityValidator for KubeConnectivityValidator {
    async fn validate(&self, kubeconfig: &[u8]) -> OnboardResult<String> {
        let client = Self::client_from_kubeconfig(kubeconfig).await?;

        let version = client.apiserver_version().await.map_err(|e| {
            OnboardError::Connectivity(format!("Failed to reach API server: {}", e))
        })?;

        debug!(version = %version.git_version, "API server reachable");
        Ok(version.git_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_garbage_kubeconfig_is_connectivity_error() {
        let err = KubeConnectivityValidator::new()
            .validate(b"::: not yaml :::")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ConnectivityError");
    }

    #[tokio::test]
    async fn test_non_utf8_kubeconfig_is_connectivity_error() {
        let err = KubeConnectivityValidator::client_from_kubeconfig(&[0xff, 0xfe, 0x00])
            .await
            .err().unwrap();
        assert!(matches!(err, OnboardError::Connectivity(_)));
    }

    #[tokio::test]
    async fn test_missing_current_context_rejected() {
        let yaml = r#"
apiVersion: v1
kind: Config
clusters: []
users: []
contexts: []
"#;
        let err = KubeConnectivityValidator::client_from_kubeconfig(yaml.as_bytes())
            .await
            .err().unwrap();
        assert!(err.to_string().contains("current-context"));
    }
}
