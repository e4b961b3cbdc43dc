//! OCM cluster onboarding plugin
//!
//! Joins Kubernetes clusters to a KubeStellar/Open-Cluster-Management hub and
//! removes them again, tracking every step in a per-cluster event log.

// Core modules
pub mod config;
pub mod error;

// Application state
pub mod state;
pub use state::AppState;

// Cluster tracking
pub mod store;

// Kubernetes integration
pub mod kubernetes;

// Hub workflows
pub mod ocm;

// HTTP and WebSocket surface
pub mod handlers;
pub mod websocket;

// Plugin lifecycle
pub mod plugin;
pub use plugin::{ClusterPlugin, Plugin, PluginError, PluginMetadata};

// Logging configuration
pub mod logging;

// Health checks
pub mod health;

// Graceful shutdown handling
pub mod shutdown;
