//! Onboarding error taxonomy and ApiError mapping
//!
//! Fatal workflow errors never reach an HTTP caller directly: the workflow runs
//! detached, so they surface as an `Error` event carrying [`OnboardError::kind`]
//! plus a failed cluster status. Only validation and resolution errors are mapped
//! to HTTP responses.

use crate::error::ApiError;
use thiserror::Error;

/// Errors raised while onboarding or detaching a cluster
#[derive(Debug, Error)]
pub enum OnboardError {
    /// Request is missing fields or carries unusable values
    #[error("Validation error: {0}")]
    Validation(String),

    /// Kubeconfig could not be parsed or the API server did not answer
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// `clusteradm get token` failed or printed no join command
    #[error("Token generation error: {0}")]
    TokenGeneration(String),

    /// `clusteradm join` exited non-zero
    #[error("Join error: {message}, output: {output}")]
    Join { message: String, output: String },

    /// CSR listing or approval failed (non-fatal)
    #[error("CSR approval error: {0}")]
    CsrApproval(String),

    /// Managed cluster missing or not available on the hub
    #[error("Verification error: {0}")]
    Verification(String),

    /// Cluster, context or kubeconfig entry does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local artifact removal failed (non-fatal)
    #[error("Cleanup error: {0}")]
    Cleanup(String),

    /// Hub-side removal failed
    #[error("Removal error: {0}")]
    Removal(String),

    /// Local I/O or other unexpected failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OnboardError {
    /// Taxonomy tag recorded on events
    pub fn kind(&self) -> &'static str {
        match self {
            OnboardError::Validation(_) => "ValidationError",
            OnboardError::Connectivity(_) => "ConnectivityError",
            OnboardError::TokenGeneration(_) => "TokenGenerationError",
            OnboardError::Join { .. } => "JoinError",
            OnboardError::CsrApproval(_) => "CSRApprovalError",
            OnboardError::Verification(_) => "VerificationError",
            OnboardError::NotFound(_) => "NotFoundError",
            OnboardError::Cleanup(_) => "CleanupError",
            OnboardError::Removal(_) => "RemovalError",
            OnboardError::Internal(_) => "InternalError",
        }
    }
}

impl From<std::io::Error> for OnboardError {
    fn from(err: std::io::Error) -> Self {
        OnboardError::Internal(format!("I/O error: {}", err))
    }
}

impl From<OnboardError> for ApiError {
    fn from(err: OnboardError) -> Self {
        match err {
            OnboardError::Validation(msg) => ApiError::BadRequest(msg),
            // Local kubeconfig resolution happens in the handler before any workflow and
            // is reported as a client error rather than a missing route.
            OnboardError::NotFound(msg) => ApiError::BadRequest(msg),
            OnboardError::Internal(msg) => ApiError::Internal(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<OnboardError> for ocm_onboard_common::Error {
    fn from(err: OnboardError) -> Self {
        match err {
            OnboardError::Validation(msg) => ocm_onboard_common::Error::Validation(msg),
            OnboardError::NotFound(msg) => ocm_onboard_common::Error::NotFound(msg),
            other => ocm_onboard_common::Error::System(other.to_string()),
        }
    }
}

/// Result type alias for onboarding operations
pub type OnboardResult<T> = std::result::Result<T, OnboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        assert_eq!(OnboardError::Connectivity("x".into()).kind(), "ConnectivityError");
        assert_eq!(
            OnboardError::Join {
                message: "exit status 1".into(),
                output: "".into()
            }
            .kind(),
            "JoinError"
        );
        assert_eq!(OnboardError::CsrApproval("x".into()).kind(), "CSRApprovalError");
        assert_eq!(OnboardError::NotFound("x".into()).kind(), "NotFoundError");
    }

    #[test]
    fn test_join_error_carries_output() {
        let err = OnboardError::Join {
            message: "exit status 1".into(),
            output: "error: hub unreachable".into(),
        };
        assert!(err.to_string().contains("hub unreachable"));
    }

    #[test]
    fn test_api_error_mapping() {
        let api: ApiError = OnboardError::NotFound("cluster 'x' not found".into()).into();
        assert_eq!(api.to_error_response().status, 400);

        let api: ApiError = OnboardError::Validation("name is required".into()).into();
        assert_eq!(api.to_error_response().status, 400);

        let api: ApiError = OnboardError::Internal("disk full".into()).into();
        assert_eq!(api.to_error_response().status, 500);
    }
}
