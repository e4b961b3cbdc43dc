//! `clusteradm` and `kubectl` process adapters
//!
//! Every hub-side call targets the ITS context explicitly with `--context`.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use super::join::JoinCommand;
use super::{ClusterJoiner, CsrApprover, JoinTokenProvider, ManagedClusterChecker, ManagedClusterRemover};
use crate::kubernetes::{OnboardError, OnboardResult};

const CSR_PREFIX: &str = "certificatesigningrequest.certificates.k8s.io/";
const AVAILABLE_JSONPATH: &str =
    "jsonpath={.status.conditions[?(@.type=='ManagedClusterConditionAvailable')].status}";

/// Captured result of a finished process
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stdout followed by stderr
    pub fn combined(&self) -> String {
        let mut combined = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&self.stderr);
        }
        combined
    }

    fn exit_description(&self) -> String {
        match self.code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs one binary with arguments, capturing its output
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
}

impl CommandRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub async fn run<I, S>(&self, args: I) -> std::io::Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(program = %self.program, "Running {:?}", cmd.as_std());
        let output = cmd.output().await?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// `clusteradm` against the hub context
#[derive(Debug, Clone)]
pub struct ClusteradmCli {
    runner: CommandRunner,
    its_context: String,
}

impl ClusteradmCli {
    pub fn new(binary: impl Into<String>, its_context: impl Into<String>) -> Self {
        Self {
            runner: CommandRunner::new(binary),
            its_context: its_context.into(),
        }
    }
}

#[async_trait]
impl JoinTokenProvider for ClusteradmCli {
    async fn join_command(&self) -> OnboardResult<JoinCommand> {
        let output = self
            .runner
            .run(["get", "token", "--context", self.its_context.as_str()])
            .await
            .map_err(|e| {
                OnboardError::TokenGeneration(format!(
                    "Failed to run {}: {}",
                    self.runner.program(),
                    e
                ))
            })?;

        if !output.success {
            return Err(OnboardError::TokenGeneration(format!(
                "clusteradm get token failed ({}): {}",
                output.exit_description(),
                output.combined().trim()
            )));
        }

        JoinCommand::parse_from_output(&output.stdout)
    }
}

#[async_trait]
impl ClusterJoiner for ClusteradmCli {
    async fn join(
        &self,
        command: &JoinCommand,
        cluster_name: &str,
        kubeconfig_path: &Path,
    ) -> OnboardResult<String> {
        let args = command.with_target(cluster_name, &kubeconfig_path.to_string_lossy());

        let output = self.runner.run(&args).await.map_err(|e| OnboardError::Join {
            message: format!("Failed to run {}: {}", self.runner.program(), e),
            output: String::new(),
        })?;

        if !output.success {
            return Err(OnboardError::Join {
                message: output.exit_description(),
                output: output.combined(),
            });
        }

        Ok(output.combined())
    }
}

/// `kubectl` against the hub context
#[derive(Debug, Clone)]
pub struct KubectlCli {
    runner: CommandRunner,
    its_context: String,
}

impl KubectlCli {
    pub fn new(binary: impl Into<String>, its_context: impl Into<String>) -> Self {
        Self {
            runner: CommandRunner::new(binary),
            its_context: its_context.into(),
        }
    }

    async fn kubectl(&self, args: &[&str]) -> std::io::Result<CommandOutput> {
        let mut full: Vec<&str> = args.to_vec();
        full.push("--context");
        full.push(&self.its_context);
        self.runner.run(full).await
    }

    async fn list_csrs(&self) -> OnboardResult<Vec<String>> {
        let output = self
            .kubectl(&["get", "csr", "-o", "name"])
            .await
            .map_err(|e| OnboardError::CsrApproval(format!("Failed to run kubectl: {}", e)))?;

        if !output.success {
            return Err(OnboardError::CsrApproval(format!(
                "failed to list CSRs: {}",
                output.combined().trim()
            )));
        }

        Ok(parse_csr_names(&output.stdout))
    }
}

/// Bare CSR names from `kubectl get csr -o name` output
pub fn parse_csr_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.strip_prefix(CSR_PREFIX).unwrap_or(line).to_string())
        .collect()
}

#[async_trait]
impl CsrApprover for KubectlCli {
    async fn approve_for(&self, cluster_name: &str) -> OnboardResult<Vec<String>> {
        let mut approved = Vec::new();
        let mut failures = Vec::new();

        for csr in self
            .list_csrs()
            .await?
            .into_iter()
            .filter(|csr| csr.contains(cluster_name))
        {
            let result = self.kubectl(&["certificate", "approve", csr.as_str()]).await;
            match result {
                Ok(output) if output.success => approved.push(csr),
                Ok(output) => {
                    warn!(cluster = %cluster_name, csr = %csr, "CSR approval failed: {}", output.combined().trim());
                    failures.push(csr);
                }
                Err(e) => {
                    warn!(cluster = %cluster_name, csr = %csr, "Failed to run kubectl: {}", e);
                    failures.push(csr);
                }
            }
        }

        if !failures.is_empty() {
            return Err(OnboardError::CsrApproval(format!(
                "failed to approve CSRs: {}",
                failures.join(", ")
            )));
        }

        Ok(approved)
    }
}

#[async_trait]
impl ManagedClusterChecker for KubectlCli {
    async fn exists(&self, cluster_name: &str) -> bool {
        match self.kubectl(&["get", "managedcluster", cluster_name]).await {
            Ok(output) => output.success,
            Err(e) => {
                warn!(cluster = %cluster_name, "Failed to run kubectl: {}", e);
                false
            }
        }
    }

    async fn verify_available(&self, cluster_name: &str) -> OnboardResult<()> {
        let output = self
            .kubectl(&["get", "managedcluster", cluster_name])
            .await
            .map_err(|e| OnboardError::Verification(format!("Failed to run kubectl: {}", e)))?;

        if !output.success {
            return Err(OnboardError::Verification(format!(
                "managed cluster not found: {}",
                output.combined().trim()
            )));
        }

        let output = self
            .kubectl(&["get", "managedcluster", cluster_name, "-o", AVAILABLE_JSONPATH])
            .await
            .map_err(|e| OnboardError::Verification(format!("Failed to run kubectl: {}", e)))?;

        if !output.success {
            return Err(OnboardError::Verification(format!(
                "failed to read managed cluster conditions: {}",
                output.combined().trim()
            )));
        }

        match output.stdout.trim() {
            "True" => Ok(()),
            "" => Err(OnboardError::Verification(
                "managed cluster has no ManagedClusterConditionAvailable condition".to_string(),
            )),
            other => Err(OnboardError::Verification(format!(
                "managed cluster is not available (status: {})",
                other
            ))),
        }
    }
}

#[async_trait]
impl ManagedClusterRemover for KubectlCli {
    async fn remove(&self, cluster_name: &str) -> OnboardResult<()> {
        let output = self
            .kubectl(&["delete", "managedcluster", cluster_name])
            .await
            .map_err(|e| OnboardError::Removal(format!("Failed to run kubectl: {}", e)))?;

        if !output.success {
            return Err(OnboardError::Removal(format!(
                "failed to delete managed cluster: {}",
                output.combined().trim()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csr_names() {
        let output = "certificatesigningrequest.certificates.k8s.io/edge-1-abcde\n\
certificatesigningrequest.certificates.k8s.io/csr-xyz\n\n";
        assert_eq!(parse_csr_names(output), vec!["edge-1-abcde", "csr-xyz"]);
    }

    #[test]
    fn test_combined_output() {
        let out = CommandOutput {
            success: false,
            code: Some(1),
            stdout: "partial".into(),
            stderr: "boom".into(),
        };
        assert_eq!(out.combined(), "partial\nboom");
        assert_eq!(out.exit_description(), "exit status 1");
    }

    #[tokio::test]
    async fn test_missing_binary_is_token_error() {
        let cli = ClusteradmCli::new("/nonexistent/clusteradm", "its1");
        let err = cli.join_command().await.unwrap_err();
        assert_eq!(err.kind(), "TokenGenerationError");
    }

    #[tokio::test]
    async fn test_missing_binary_means_absent() {
        let cli = KubectlCli::new("/nonexistent/kubectl", "its1");
        assert!(!cli.exists("edge-1").await);
        assert!(matches!(
            cli.verify_available("edge-1").await,
            Err(OnboardError::Verification(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runner_captures_exit_and_streams() {
        let runner = CommandRunner::new("sh");
        let out = runner.run(["-c", "echo out; echo err 1>&2; exit 3"]).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    /// Shell script standing in for a binary; every invocation's arguments
    /// are appended to `calls.log` next to it
    #[cfg(unix)]
    fn fake_binary(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("kubectl");
        let log = dir.join("calls.log");
        let script = format!("#!/bin/sh\necho \"$*\" >> '{}'\n{}\n", log.display(), body);
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[cfg(unix)]
    fn calls(dir: &Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[cfg(unix)]
    const CSR_LISTING: &str = r#"
case "$*" in
  "get csr -o name --context its1")
    echo certificatesigningrequest.certificates.k8s.io/edge-1-aaa
    echo certificatesigningrequest.certificates.k8s.io/other-bbb
    echo certificatesigningrequest.certificates.k8s.io/csr-edge-1-ccc ;;
  "certificate approve edge-1-aaa --context its1") echo approved ;;
  "certificate approve csr-edge-1-ccc --context its1") [ -f "$(dirname "$0")/deny" ] && { echo forbidden >&2; exit 1; }; echo approved ;;
  *) echo "unexpected: $*" >&2; exit 2 ;;
esac"#;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_approve_only_matching_csrs_on_its_context() {
        let dir = tempfile::tempdir().unwrap();
        let cli = KubectlCli::new(fake_binary(dir.path(), CSR_LISTING), "its1");

        let approved = cli.approve_for("edge-1").await.unwrap();
        assert_eq!(approved, vec!["edge-1-aaa", "csr-edge-1-ccc"]);

        let calls = calls(dir.path());
        assert_eq!(
            calls,
            vec![
                "get csr -o name --context its1",
                "certificate approve edge-1-aaa --context its1",
                "certificate approve csr-edge-1-ccc --context its1",
            ]
        );
        assert!(calls.iter().all(|c| !c.contains("other-bbb")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_approve_reports_failed_csrs_after_trying_all() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("deny"), "").unwrap();
        let cli = KubectlCli::new(fake_binary(dir.path(), CSR_LISTING), "its1");

        match cli.approve_for("edge-1").await {
            Err(OnboardError::CsrApproval(msg)) => {
                assert_eq!(msg, "failed to approve CSRs: csr-edge-1-ccc")
            }
            other => panic!("expected CSR approval error, got {:?}", other),
        }
        assert_eq!(calls(dir.path()).len(), 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_approve_without_matching_csrs_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cli = KubectlCli::new(fake_binary(dir.path(), CSR_LISTING), "its1");

        assert!(cli.approve_for("prod-9").await.unwrap().is_empty());
        assert_eq!(calls(dir.path()), vec!["get csr -o name --context its1"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_csr_listing_failure() {
        let dir = tempfile::tempdir().unwrap();
        let cli = KubectlCli::new(
            fake_binary(dir.path(), "echo 'connection refused' >&2; exit 1"),
            "its1",
        );

        match cli.approve_for("edge-1").await {
            Err(OnboardError::CsrApproval(msg)) => {
                assert_eq!(msg, "failed to list CSRs: connection refused")
            }
            other => panic!("expected CSR approval error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_verify_available_reads_condition() {
        let dir = tempfile::tempdir().unwrap();
        let condition = dir.path().join("condition");
        let body = format!(
            r#"
case "$*" in
  "get managedcluster edge-1 --context its1") echo "edge-1   true" ;;
  "get managedcluster edge-1 -o "*" --context its1") cat '{}' ;;
  *) echo 'Error from server (NotFound)' >&2; exit 1 ;;
esac"#,
            condition.display()
        );
        let cli = KubectlCli::new(fake_binary(dir.path(), &body), "its1");

        std::fs::write(&condition, "True").unwrap();
        assert!(cli.verify_available("edge-1").await.is_ok());
        assert!(calls(dir.path())[1].contains("ManagedClusterConditionAvailable"));

        std::fs::write(&condition, "False").unwrap();
        match cli.verify_available("edge-1").await {
            Err(OnboardError::Verification(msg)) => {
                assert_eq!(msg, "managed cluster is not available (status: False)")
            }
            other => panic!("expected verification error, got {:?}", other),
        }

        std::fs::write(&condition, "").unwrap();
        match cli.verify_available("edge-1").await {
            Err(OnboardError::Verification(msg)) => assert!(msg.contains("no ManagedClusterConditionAvailable")),
            other => panic!("expected verification error, got {:?}", other),
        }

        match cli.verify_available("ghost").await {
            Err(OnboardError::Verification(msg)) => assert!(msg.starts_with("managed cluster not found")),
            other => panic!("expected verification error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exists_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"
case "$*" in
  "get managedcluster edge-1 --context its1") echo edge-1 ;;
  "delete managedcluster edge-1 --context its1") echo deleted ;;
  *) echo 'Error from server (NotFound)' >&2; exit 1 ;;
esac"#;
        let cli = KubectlCli::new(fake_binary(dir.path(), body), "its1");

        assert!(cli.exists("edge-1").await);
        assert!(!cli.exists("ghost").await);
        assert!(cli.remove("edge-1").await.is_ok());
        match cli.remove("ghost").await {
            Err(OnboardError::Removal(msg)) => assert!(msg.contains("NotFound")),
            other => panic!("expected removal error, got {:?}", other),
        }
        assert!(calls(dir.path()).iter().all(|c| c.ends_with("--context its1")));
    }
}
