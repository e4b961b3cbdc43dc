//! Plugin health checks
//!
//! The plugin itself has no long-lived connections; what can go wrong is a
//! missing external tool or an unusable kubeconfig directory.

use ocm_onboard_common::{ComponentHealth, HealthStatus, PluginHealth};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// An external binary the workflows shell out to
#[derive(Debug, Clone)]
pub struct ToolRequirement {
    pub name: String,
    pub binary: String,
}

/// Health checker for plugin components
pub struct HealthChecker {
    start_time: Instant,
    version: String,
    tools: Vec<ToolRequirement>,
    kubeconfig_dir: PathBuf,
}

impl HealthChecker {
    pub fn new(version: &str, tools: Vec<ToolRequirement>, kubeconfig_dir: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            version: version.to_string(),
            tools,
            kubeconfig_dir,
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check that a tool resolves to an executable
    pub fn check_tool(&self, tool: &ToolRequirement) -> ComponentHealth {
        match find_executable(&tool.binary) {
            Some(path) => ComponentHealth {
                name: tool.name.clone(),
                status: HealthStatus::Healthy,
                message: Some(format!("found at {}", path.display())),
            },
            None => ComponentHealth {
                name: tool.name.clone(),
                status: HealthStatus::Degraded,
                message: Some(format!("'{}' not found in PATH", tool.binary)),
            },
        }
    }

    /// Every configured tool
    pub fn check_tools(&self) -> Vec<ComponentHealth> {
        self.tools.iter().map(|t| self.check_tool(t)).collect()
    }

    /// Check the per-attempt kubeconfig directory exists
    pub fn check_kubeconfig_dir(&self) -> ComponentHealth {
        let status = if self.kubeconfig_dir.is_dir() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        ComponentHealth {
            name: "kubeconfig_dir".to_string(),
            status,
            message: Some(self.kubeconfig_dir.display().to_string()),
        }
    }

    /// Aggregate component health into overall status
    pub fn aggregate_status(components: &[ComponentHealth]) -> HealthStatus {
        let mut has_degraded = false;

        for component in components {
            match component.status {
                HealthStatus::Unhealthy => return HealthStatus::Unhealthy,
                HealthStatus::Degraded => has_degraded = true,
                HealthStatus::Healthy => {}
            }
        }

        if has_degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Build complete health response
    pub fn build_response(&self, initialized: bool) -> PluginHealth {
        let mut components = self.check_tools();
        components.push(self.check_kubeconfig_dir());

        PluginHealth {
            status: Self::aggregate_status(&components),
            timestamp: chrono::Utc::now(),
            version: self.version.clone(),
            initialized,
            uptime_seconds: self.uptime_seconds(),
            components,
        }
    }
}

/// Resolve `binary` the way a shell would: paths are taken as-is, bare names
/// are searched in `PATH`
pub fn find_executable(binary: &str) -> Option<PathBuf> {
    if binary.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(binary);
        return is_executable(&path).then_some(path);
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(binary))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(status: HealthStatus) -> ComponentHealth {
        ComponentHealth {
            name: "x".to_string(),
            status,
            message: None,
        }
    }

    #[test]
    fn test_aggregate_status() {
        assert_eq!(
            HealthChecker::aggregate_status(&[component(HealthStatus::Healthy)]),
            HealthStatus::Healthy
        );
        assert_eq!(
            HealthChecker::aggregate_status(&[
                component(HealthStatus::Healthy),
                component(HealthStatus::Degraded)
            ]),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthChecker::aggregate_status(&[
                component(HealthStatus::Degraded),
                component(HealthStatus::Unhealthy)
            ]),
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn test_missing_tool_is_degraded() {
        let checker = HealthChecker::new("1.0.0", vec![], PathBuf::from("/"));
        let health = checker.check_tool(&ToolRequirement {
            name: "clusteradm".to_string(),
            binary: "definitely-not-a-real-binary-4711".to_string(),
        });
        assert_eq!(health.status, HealthStatus::Degraded);
    }

    #[cfg(unix)]
    #[test]
    fn test_absolute_tool_path() {
        let checker = HealthChecker::new("1.0.0", vec![], PathBuf::from("/"));
        let health = checker.check_tool(&ToolRequirement {
            name: "sh".to_string(),
            binary: "/bin/sh".to_string(),
        });
        assert_eq!(health.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_build_response_reports_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let checker = HealthChecker::new("1.0.0", vec![], dir.path().join("missing"));
        let health = checker.build_response(true);

        assert_eq!(health.version, "1.0.0");
        assert!(health.initialized);
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert_eq!(health.components.len(), 1);
    }

    #[test]
    fn test_build_response_reports_uptime() {
        let mut checker = HealthChecker::new("1.0.0", vec![], PathBuf::from("/"));
        assert_eq!(checker.build_response(false).uptime_seconds, 0);

        checker.start_time = Instant::now()
            .checked_sub(std::time::Duration::from_secs(5))
            .unwrap();
        let health = checker.build_response(false);
        assert!(health.uptime_seconds >= 5);
        assert_eq!(health.uptime_seconds, checker.uptime_seconds());
    }
}
