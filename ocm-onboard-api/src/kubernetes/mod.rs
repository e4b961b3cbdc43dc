//! Kubernetes integration for cluster onboarding
//!
//! Provides:
//! - API server connectivity checks from raw kubeconfig bytes
//! - Extraction of single-cluster kubeconfigs from the local kubeconfig
//! - The onboarding error taxonomy

pub mod client;
pub mod error;
pub mod kubeconfig;

pub use client::KubeConnectivityValidator;
pub use error::{OnboardError, OnboardResult};
pub use kubeconfig::KubeconfigResolver;
