//! Configuration management for the onboarding plugin
//!
//! Settings are loaded from, lowest priority first:
//! 1. Default values
//! 2. Configuration file (TOML format)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main plugin configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Standalone host settings
    pub server: ServerConfig,
    /// Filesystem locations
    pub paths: PathsConfig,
    /// Hub access
    pub ocm: OcmConfig,
    /// Route prefixes
    pub endpoints: EndpointsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Seconds to wait for in-flight workflows on shutdown
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory for per-attempt kubeconfig files
    pub kubeconfig_dir: PathBuf,
    /// Local kubeconfig to resolve cluster names from; `KUBECONFIG` or
    /// `~/.kube/config` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_kubeconfig: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcmConfig {
    /// kubectl context of the ITS hub
    pub its_context: String,
    pub kubectl_bin: String,
    pub clusteradm_bin: String,
    /// Pause between join and CSR approval
    pub csr_settle_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Prefix of the HTTP routes
    pub api_base: String,
    /// Prefix of the WebSocket routes
    pub ws_base: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Directory for log files
    pub log_dir: PathBuf,
    /// Enable file logging
    pub file_logging_enabled: bool,
    /// JSON console output
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_secs: 30,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            kubeconfig_dir: PathBuf::from("/tmp/kubestellar-clusters"),
            source_kubeconfig: None,
        }
    }
}

impl Default for OcmConfig {
    fn default() -> Self {
        Self {
            its_context: "its1".to_string(),
            kubectl_bin: "kubectl".to_string(),
            clusteradm_bin: "clusteradm".to_string(),
            csr_settle_delay_secs: 5,
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            api_base: "/api/plugins/kubestellar-cluster-plugin".to_string(),
            ws_base: "/ws/plugins/kubestellar-cluster-plugin".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("/var/log/ocm-onboard"),
            file_logging_enabled: false,
            json: false,
        }
    }
}

impl OcmConfig {
    pub fn csr_settle_delay(&self) -> Duration {
        Duration::from_secs(self.csr_settle_delay_secs)
    }
}

impl EndpointsConfig {
    /// Where the event log of `cluster` can be read
    pub fn logs_endpoint(&self, cluster: &str) -> String {
        format!("{}/logs/{}", self.api_base.trim_end_matches('/'), cluster)
    }

    pub fn onboarding_ws_endpoint(&self, cluster: &str) -> String {
        format!(
            "{}/onboarding?cluster={}",
            self.ws_base.trim_end_matches('/'),
            cluster
        )
    }

    pub fn detachment_ws_endpoint(&self, cluster: &str) -> String {
        format!(
            "{}/detachment?cluster={}",
            self.ws_base.trim_end_matches('/'),
            cluster
        )
    }
}

impl PluginConfig {
    /// Load configuration from the first config file found plus environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_path_buf(), e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            std::env::var("OCM_ONBOARD_CONFIG").ok().map(PathBuf::from),
            Some(PathBuf::from("/etc/ocm-onboard/config.toml")),
            Some(PathBuf::from("./ocm-onboard.toml")),
        ];

        paths.into_iter().flatten().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key/value source
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("OCM_ONBOARD_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("OCM_ONBOARD_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        // Paths
        if let Some(dir) = lookup("OCM_ONBOARD_KUBECONFIG_DIR") {
            self.paths.kubeconfig_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("OCM_ONBOARD_SOURCE_KUBECONFIG") {
            self.paths.source_kubeconfig = Some(PathBuf::from(path));
        }

        // Hub; the bare variable is what existing deployments set
        if let Some(context) = lookup("ITS_CONTEXT") {
            self.ocm.its_context = context;
        }
        if let Some(context) = lookup("OCM_ONBOARD_ITS_CONTEXT") {
            self.ocm.its_context = context;
        }
        if let Some(bin) = lookup("OCM_ONBOARD_KUBECTL") {
            self.ocm.kubectl_bin = bin;
        }
        if let Some(bin) = lookup("OCM_ONBOARD_CLUSTERADM") {
            self.ocm.clusteradm_bin = bin;
        }
        if let Some(secs) = lookup("OCM_ONBOARD_CSR_SETTLE_DELAY").and_then(|s| s.parse().ok()) {
            self.ocm.csr_settle_delay_secs = secs;
        }

        // Logging
        if let Some(level) = lookup("OCM_ONBOARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(dir) = lookup("OCM_ONBOARD_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(dir);
        }
        if let Some(enabled) = lookup("OCM_ONBOARD_FILE_LOGGING") {
            self.logging.file_logging_enabled = enabled.parse().unwrap_or(false);
        }
        if let Some(json) = lookup("OCM_ONBOARD_LOG_JSON") {
            self.logging.json = json.parse().unwrap_or(false);
        }
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("Port cannot be 0".to_string()));
        }

        if self.ocm.its_context.trim().is_empty() {
            return Err(ConfigError::Validation(
                "ITS context cannot be empty".to_string(),
            ));
        }

        if !self.paths.kubeconfig_dir.is_absolute() {
            return Err(ConfigError::Validation(format!(
                "kubeconfig_dir must be an absolute path, got {}",
                self.paths.kubeconfig_dir.display()
            )));
        }

        if self.ocm.kubectl_bin.is_empty() || self.ocm.clusteradm_bin.is_empty() {
            return Err(ConfigError::Validation(
                "kubectl_bin and clusteradm_bin cannot be empty".to_string(),
            ));
        }

        for base in [&self.endpoints.api_base, &self.endpoints.ws_base] {
            if !base.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "endpoint prefix '{}' must start with '/'",
                    base
                )));
            }
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0:?}: {1}")]
    FileRead(PathBuf, String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Config validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = PluginConfig::default();
        assert_eq!(config.ocm.its_context, "its1");
        assert_eq!(config.paths.kubeconfig_dir, PathBuf::from("/tmp/kubestellar-clusters"));
        assert_eq!(config.ocm.csr_settle_delay(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_urls() {
        let endpoints = EndpointsConfig::default();
        assert_eq!(
            endpoints.logs_endpoint("prod-1"),
            "/api/plugins/kubestellar-cluster-plugin/logs/prod-1"
        );
        assert_eq!(
            endpoints.onboarding_ws_endpoint("prod-1"),
            "/ws/plugins/kubestellar-cluster-plugin/onboarding?cluster=prod-1"
        );
        assert_eq!(
            endpoints.detachment_ws_endpoint("prod-1"),
            "/ws/plugins/kubestellar-cluster-plugin/detachment?cluster=prod-1"
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = PluginConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = PluginConfig::default();
        config.ocm.its_context = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = PluginConfig::default();
        config.paths.kubeconfig_dir = PathBuf::from("relative/dir");
        assert!(config.validate().is_err());

        let mut config = PluginConfig::default();
        config.endpoints.api_base = "api".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocm-onboard.toml");
        std::fs::write(&path, "[ocm]\nits_context = \"its-prod\"\n").unwrap();

        let config = PluginConfig::load_from_file(&path).unwrap();
        assert_eq!(config.ocm.its_context, "its-prod");
        assert_eq!(config.ocm.kubectl_bin, "kubectl");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_unparseable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[ocm\nits_context = ").unwrap();
        assert!(matches!(
            PluginConfig::load_from_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ITS_CONTEXT", "its-legacy"),
            ("OCM_ONBOARD_PORT", "9090"),
            ("OCM_ONBOARD_CSR_SETTLE_DELAY", "0"),
            ("OCM_ONBOARD_KUBECONFIG_DIR", "/var/tmp/clusters"),
        ]
        .into_iter()
        .collect();

        let mut config = PluginConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.ocm.its_context, "its-legacy");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.ocm.csr_settle_delay(), Duration::ZERO);
        assert_eq!(config.paths.kubeconfig_dir, PathBuf::from("/var/tmp/clusters"));
    }

    #[test]
    fn test_prefixed_its_context_wins() {
        let mut config = PluginConfig::default();
        config.apply_overrides(|key| match key {
            "ITS_CONTEXT" => Some("legacy".to_string()),
            "OCM_ONBOARD_ITS_CONTEXT" => Some("preferred".to_string()),
            _ => None,
        });
        assert_eq!(config.ocm.its_context, "preferred");
    }

    #[test]
    fn test_generate_sample_config() {
        let sample = PluginConfig::generate_sample();
        assert!(sample.contains("[server]"));
        assert!(sample.contains("[paths]"));
        assert!(sample.contains("[ocm]"));
        assert!(sample.contains("[endpoints]"));
        assert!(sample.contains("[logging]"));
        assert!(sample.contains("its1"));
    }
}
