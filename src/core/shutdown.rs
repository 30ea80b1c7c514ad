//! Signal-driven shutdown for the demo driver
//!
//! Wraps a future so that SIGINT/SIGTERM (or Ctrl-C elsewhere) is delivered
//! to it as a broadcast message, letting the driver stop consumers cleanly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Coordinates graceful shutdown across the application
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
    shutdown_requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new() -> (Self, broadcast::Receiver<()>) {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(8);
        let coordinator = Self {
            shutdown_tx,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        };

        (coordinator, shutdown_rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Run `future_fn` with signal handlers installed
    ///
    /// The closure receives the shutdown receiver and decides itself how to
    /// react, typically by `select!`ing on it.
    pub async fn guard<F, Fut, R, E>(future_fn: F) -> Result<R, E>
    where
        F: FnOnce(broadcast::Receiver<()>) -> Fut,
        Fut: std::future::Future<Output = Result<R, E>>,
    {
        let (coordinator, shutdown_rx) = Self::new();

        setup_signal_handlers(
            coordinator.shutdown_tx.clone(),
            coordinator.shutdown_requested.clone(),
        );

        future_fn(shutdown_rx).await
    }
}

fn setup_signal_handlers(shutdown_tx: broadcast::Sender<()>, shutdown_requested: Arc<AtomicBool>) {
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }

        use std::sync::atomic::AtomicUsize;
        use tokio::signal::unix::{signal, SignalKind};
        let signal_count = Arc::new(AtomicUsize::new(0));

        for kind in [SignalKind::interrupt(), SignalKind::terminate()] {
            let tx = shutdown_tx.clone();
            let requested = shutdown_requested.clone();
            let sig_ctr = signal_count.clone();

            tokio::spawn(async move {
                let Ok(mut sig) = signal(kind) else {
                    return;
                };
                while sig.recv().await.is_some() {
                    let prev = sig_ctr.fetch_add(1, Ordering::AcqRel);
                    requested.store(true, Ordering::Release);
                    let _ = tx.send(());
                    if prev >= 1 {
                        // Second signal while consumers are still draining
                        log::warn!("Second shutdown signal received; exiting");
                        std::process::exit(130);
                    }
                }
            });
        }
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown_requested.store(true, Ordering::Release);
                let _ = shutdown_tx.send(());
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_shutdown_coordinator_trigger() {
        let (coordinator, mut rx) = ShutdownCoordinator::new();
        let mut second = coordinator.subscribe();
        assert!(!coordinator.is_shutdown_requested());

        coordinator.trigger_shutdown();

        assert!(coordinator.is_shutdown_requested());
        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_ok());
        assert!(timeout(Duration::from_millis(100), second.recv()).await.is_ok());
    }

    #[tokio::test]
    async fn test_guard_returns_closure_result() {
        let result = ShutdownCoordinator::guard(|mut shutdown_rx| async move {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(20)) => Ok::<i32, &str>(42),
                _ = shutdown_rx.recv() => Ok(-1),
            }
        })
        .await;

        assert_eq!(result, Ok(42));
    }
}
