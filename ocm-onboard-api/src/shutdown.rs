//! Graceful shutdown handling
//!
//! Signal handling for the standalone host and an ordered list of cleanup
//! operations run once the server has stopped accepting requests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::plugin::Plugin;

/// Shutdown coordinator for graceful termination
#[derive(Clone)]
pub struct ShutdownCoordinator {
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    is_shutting_down: Arc<AtomicBool>,
    timeout: Duration,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator with default 30s timeout
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            shutdown_tx,
            shutdown_rx,
            is_shutting_down: Arc::new(AtomicBool::new(false)),
            timeout,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::SeqCst)
    }

    /// Initiate graceful shutdown
    pub fn shutdown(&self) {
        if self.is_shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("Initiating graceful shutdown...");
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for SIGTERM/SIGINT (Ctrl+C elsewhere), then trigger shutdown
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            match (
                signal(SignalKind::terminate()),
                signal(SignalKind::interrupt()),
            ) {
                (Ok(mut sigterm), Ok(mut sigint)) => {
                    tokio::select! {
                        _ = sigterm.recv() => info!("Received SIGTERM"),
                        _ = sigint.recv() => info!("Received SIGINT"),
                    }
                }
                (Err(e), _) | (_, Err(e)) => {
                    error!("Failed to register signal handlers: {}", e);
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl+C: {}", e);
                        return;
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                return;
            }
            info!("Received Ctrl+C");
        }

        self.shutdown();
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Future that resolves once shutdown starts, for axum's graceful shutdown
    pub fn signal(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();

        async move {
            while !*rx.borrow() {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Cleanup operations to run during shutdown
pub struct CleanupRunner {
    operations: Vec<Box<dyn CleanupOperation + Send + Sync>>,
    timeout: Duration,
}

impl CleanupRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            operations: Vec::new(),
            timeout,
        }
    }

    pub fn add<T: CleanupOperation + Send + Sync + 'static>(&mut self, op: T) {
        self.operations.push(Box::new(op));
    }

    /// Run all cleanup operations in registration order
    pub async fn run_all(&self) {
        for (i, op) in self.operations.iter().enumerate() {
            info!(
                "Running cleanup operation {}/{}: {}",
                i + 1,
                self.operations.len(),
                op.name()
            );

            match timeout(self.timeout, op.cleanup()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Cleanup operation '{}' failed: {}", op.name(), e),
                Err(_) => warn!(
                    "Cleanup operation '{}' did not complete within {:?}",
                    op.name(),
                    self.timeout
                ),
            }
        }
    }
}

/// Trait for cleanup operations during shutdown
#[async_trait::async_trait]
pub trait CleanupOperation {
    fn name(&self) -> &'static str;

    async fn cleanup(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Shuts a plugin down through its own cleanup hook
pub struct PluginCleanup<P: Plugin> {
    plugin: Arc<P>,
}

impl<P: Plugin> PluginCleanup<P> {
    pub fn new(plugin: Arc<P>) -> Self {
        Self { plugin }
    }
}

#[async_trait::async_trait]
impl<P: Plugin + 'static> CleanupOperation for PluginCleanup<P> {
    fn name(&self) -> &'static str {
        "plugin"
    }

    async fn cleanup(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(plugin = %self.plugin.metadata().id, "Cleaning up plugin...");
        self.plugin.cleanup().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_shutdown_coordinator() {
        let coordinator = ShutdownCoordinator::new();
        let mut rx = coordinator.subscribe();

        assert!(!coordinator.is_shutting_down());

        coordinator.shutdown();
        coordinator.shutdown();

        assert!(coordinator.is_shutting_down());
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_signal_resolves_after_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        let signal = coordinator.signal();
        coordinator.shutdown();
        tokio::time::timeout(Duration::from_secs(1), signal)
            .await
            .unwrap();
    }

    struct Counting(Arc<AtomicUsize>);

    #[async_trait::async_trait]
    impl CleanupOperation for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn cleanup(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err("second half failed".into())
        }
    }

    #[tokio::test]
    async fn test_cleanup_runner_continues_after_failure() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut runner = CleanupRunner::new(Duration::from_secs(1));
        runner.add(Counting(count.clone()));
        runner.add(Counting(count.clone()));

        runner.run_all().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
