//! Graceful shutdown plumbing
//!
//! One signal is shared by the HTTP server and the background sweeps;
//! triggering it once fans out to every waiter, including waiters that
//! subscribe after the fact.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};

/// Shutdown signal that can be cloned and shared across tasks
#[derive(Clone)]
pub struct ShutdownSignal {
    sender: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            info!("🛑 Shutdown signal triggered");
            let _ = self.sender.send(());
        }
    }

    /// Wait until shutdown is triggered. Resolves immediately when the
    /// signal already fired, so a waiter that subscribes late never hangs.
    pub async fn wait(&self) {
        if self.triggered.load(Ordering::SeqCst) {
            return;
        }
        let mut rx = self.sender.subscribe();
        // The flag flips before the broadcast is sent; re-checking after
        // subscribing closes the window where the send was missed.
        if self.triggered.load(Ordering::SeqCst) {
            return;
        }
        let _ = rx.recv().await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Listen for OS shutdown signals (SIGTERM, SIGINT)
pub async fn listen_for_shutdown_signals(shutdown: ShutdownSignal) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("📡 Received SIGTERM signal");
            }
            _ = sigint.recv() => {
                info!("📡 Received SIGINT signal (Ctrl+C)");
            }
        }

        shutdown.trigger();
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("📡 Received Ctrl+C signal");
        shutdown.trigger();
    }
}

/// Owns the signal and the cleanup timeout for one process
pub struct ShutdownCoordinator {
    signal: ShutdownSignal,
    timeout_secs: u64,
}

impl ShutdownCoordinator {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            signal: ShutdownSignal::new(),
            timeout_secs,
        }
    }

    pub fn signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    pub fn start_signal_listener(&self) {
        let signal = self.signal.clone();
        tokio::spawn(async move {
            listen_for_shutdown_signals(signal).await;
        });
    }

    /// Wait for the signal, then run `cleanup` bounded by the timeout.
    /// Returns false when cleanup was cut off.
    pub async fn shutdown_with_cleanup<F, Fut>(&self, cleanup: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        self.signal.wait().await;
        info!(
            "⏳ Starting graceful shutdown (timeout: {}s)...",
            self.timeout_secs
        );

        match tokio::time::timeout(
            tokio::time::Duration::from_secs(self.timeout_secs),
            cleanup(),
        )
        .await
        {
            Ok(()) => {
                info!("✅ Graceful shutdown completed");
                true
            }
            Err(_) => {
                warn!("⚠️ Graceful shutdown timed out after {}s", self.timeout_secs);
                false
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(30)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_resolves_after_trigger() {
        let signal = ShutdownSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });

        tokio::task::yield_now().await;
        signal.trigger();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn late_waiter_does_not_hang() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        // Subscribing after the broadcast fired must still resolve
        signal.wait().await;
    }

    #[tokio::test]
    async fn trigger_is_idempotent() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        signal.trigger();
        signal.wait().await;
    }

    #[tokio::test]
    async fn cleanup_runs_within_timeout() {
        let coordinator = ShutdownCoordinator::new(5);
        coordinator.signal().trigger();

        let completed = coordinator.shutdown_with_cleanup(|| async {}).await;
        assert!(completed);
    }

    #[tokio::test]
    async fn slow_cleanup_is_cut_off() {
        let coordinator = ShutdownCoordinator::new(0);
        coordinator.signal().trigger();

        let completed = coordinator
            .shutdown_with_cleanup(|| async {
                tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
            })
            .await;
        assert!(!completed);
    }
}
