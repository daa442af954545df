//! Graceful Shutdown Handling
//!
//! Listens for SIGTERM and SIGINT, broadcasts a stop signal to the HTTP
//! server, and bounds how long in-flight requests may take to drain.

use crate::Result;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Shutdown coordinator that manages the graceful shutdown process
pub struct ShutdownCoordinator {
    /// Broadcast sender for the shutdown signal
    shutdown_tx: broadcast::Sender<()>,
    /// Upper bound on draining in-flight requests
    timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(timeout: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_tx,
            timeout,
        }
    }

    /// Get a receiver that resolves once shutdown begins
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Broadcast the shutdown signal to every subscriber
    pub fn trigger(&self) {
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal: {}", e);
        }
    }

    /// Wait for SIGTERM or SIGINT (Ctrl+C on Windows), then trigger shutdown
    pub async fn listen_for_signals(&self) -> Result<()> {
        info!("Starting shutdown signal listener");

        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                }
            }
        }

        #[cfg(windows)]
        {
            signal::ctrl_c().await?;
            info!("Received Ctrl+C, initiating graceful shutdown");
        }

        self.trigger();
        Ok(())
    }

    /// Wait for a server task to finish draining, aborting it after the timeout.
    ///
    /// Returns `true` when the task finished on its own.
    pub async fn drain(&self, mut task: JoinHandle<Result<()>>) -> bool {
        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(Ok(()))) => {
                info!("All in-flight requests drained");
                true
            }
            Ok(Ok(Err(e))) => {
                error!("Server exited with error during shutdown: {}", e);
                true
            }
            Ok(Err(e)) => {
                if !e.is_cancelled() {
                    error!("Server task failed: {}", e);
                }
                true
            }
            Err(_) => {
                warn!(
                    "Shutdown timeout of {:?} reached with requests still in flight, aborting",
                    self.timeout
                );
                task.abort();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_shutdown_signal_broadcast() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        let mut first = coordinator.subscribe();
        let mut second = coordinator.subscribe();

        coordinator.trigger();

        assert!(first.recv().await.is_ok());
        assert!(second.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_drain_waits_for_task() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        let mut rx = coordinator.subscribe();
        let task = tokio::spawn(async move {
            let _ = rx.recv().await;
            Ok(())
        });

        coordinator.trigger();
        assert!(coordinator.drain(task).await);
    }

    #[tokio::test]
    async fn test_drain_aborts_after_timeout() {
        let coordinator = ShutdownCoordinator::new(Duration::from_millis(50));
        let task = tokio::spawn(async {
            sleep(Duration::from_secs(30)).await;
            Ok(())
        });

        assert!(!coordinator.drain(task).await);
    }
}
