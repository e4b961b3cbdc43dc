//! Join command parsing
//!
//! `clusteradm get token` prints a ready-to-paste `clusteradm join ...` line among
//! other text. The line is tokenized on whitespace and retargeted at the cluster
//! being onboarded.

use crate::kubernetes::{OnboardError, OnboardResult};

const JOIN_MARKER: &str = "clusteradm join";
const CLUSTER_NAME_FLAG: &str = "--cluster-name";

/// Arguments of a `clusteradm join` invocation, excluding the program itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCommand {
    args: Vec<String>,
}

impl JoinCommand {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }

    /// Extract the join command from `clusteradm get token` output
    pub fn parse_from_output(output: &str) -> OnboardResult<Self> {
        let line = output
            .lines()
            .find(|line| line.contains(JOIN_MARKER))
            .ok_or_else(|| {
                OnboardError::TokenGeneration(
                    "join command not found in clusteradm output".to_string(),
                )
            })?;

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let start = tokens
            .windows(2)
            .position(|w| w[0].ends_with("clusteradm") && w[1] == "join")
            .ok_or_else(|| {
                OnboardError::TokenGeneration(format!("malformed join command: {}", line.trim()))
            })?;

        let mut args = Vec::with_capacity(tokens.len() - start);
        let mut iter = tokens[start + 1..].iter();
        while let Some(token) = iter.next() {
            // The printed command carries a `<cluster_name>` placeholder
            if *token == CLUSTER_NAME_FLAG {
                iter.next();
                continue;
            }
            if token.starts_with("--cluster-name=") {
                continue;
            }
            args.push(token.to_string());
        }

        Ok(Self { args })
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Arguments with the target cluster name and kubeconfig appended
    pub fn with_target(&self, cluster_name: &str, kubeconfig_path: &str) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(CLUSTER_NAME_FLAG.to_string());
        args.push(cluster_name.to_string());
        args.push("--kubeconfig".to_string());
        args.push(kubeconfig_path.to_string());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN_OUTPUT: &str = "token=abc.def\n\
please log on spoke and run:\n\
clusteradm join --hub-token abc.def --hub-apiserver https://hub:6443 --wait --cluster-name <cluster_name>\n";

    #[test]
    fn test_parse_strips_placeholder() {
        let cmd = JoinCommand::parse_from_output(TOKEN_OUTPUT).unwrap();
        assert_eq!(
            cmd.args(),
            &["join", "--hub-token", "abc.def", "--hub-apiserver", "https://hub:6443", "--wait"]
        );
    }

    #[test]
    fn test_with_target_appends_name_and_kubeconfig() {
        let cmd = JoinCommand::parse_from_output(TOKEN_OUTPUT).unwrap();
        let args = cmd.with_target("edge-1", "/tmp/kubestellar-clusters/edge-1-kubeconfig.yaml");
        assert_eq!(
            &args[args.len() - 4..],
            &[
                "--cluster-name",
                "edge-1",
                "--kubeconfig",
                "/tmp/kubestellar-clusters/edge-1-kubeconfig.yaml"
            ]
        );
        assert_eq!(args.iter().filter(|a| *a == "--cluster-name").count(), 1);
    }

    #[test]
    fn test_parse_tolerates_leading_text() {
        let cmd = JoinCommand::parse_from_output("  $ clusteradm join --hub-token t --hub-apiserver https://h")
            .unwrap();
        assert_eq!(cmd.args()[0], "join");
        assert_eq!(cmd.args()[1..3], ["--hub-token", "t"]);
    }

    #[test]
    fn test_parse_inline_cluster_name_flag() {
        let cmd =
            JoinCommand::parse_from_output("clusteradm join --hub-token t --cluster-name=<cluster_name>")
                .unwrap();
        assert_eq!(cmd.args(), &["join", "--hub-token", "t"]);
    }

    #[test]
    fn test_missing_join_line() {
        let err = JoinCommand::parse_from_output("error: no bootstrap token\n").unwrap_err();
        assert_eq!(err.kind(), "TokenGenerationError");
    }
}
