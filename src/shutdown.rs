//! # Coordinated shutdown: fire-once broadcast plus counting join.
//!
//! [`ShutdownCoordinator`] is the only cross-cutting coordination primitive
//! in the runtime: any component may trigger shutdown, every background loop
//! observes it exactly once, and the owning process joins all tracked loops
//! before exiting - bounded by a grace period.
//!
//! ## Rules
//! - `trigger()` is idempotent; repeated calls are no-ops, never a
//!   double-fire fault.
//! - Loops are registered with [`spawn`](ShutdownCoordinator::spawn); the
//!   join counts them and [`join_with_grace`](ShutdownCoordinator::join_with_grace)
//!   blocks until all have exited.
//! - A loop that outlives the grace period is abandoned and reported via
//!   [`RuntimeError::GraceExceeded`]; nothing is force-killed.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::RuntimeError;

/// Broadcast-once shutdown signal with a counting join.
///
/// Cheap to clone; all clones share the same signal and tracker.
#[derive(Clone, Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    tracker: TaskTracker,
}

impl ShutdownCoordinator {
    /// Creates an untriggered coordinator with no tracked loops.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the shutdown signal. Idempotent.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// True once the signal has fired.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the signal fires (immediately if it already has).
    pub async fn triggered(&self) {
        self.token.cancelled().await;
    }

    /// Child token that fires with the shutdown signal but can also be
    /// cancelled independently (per-subsystem stop).
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Spawns a tracked background loop.
    ///
    /// The loop counts toward [`join_with_grace`](Self::join_with_grace);
    /// it is expected to observe [`triggered`](Self::triggered) (or a
    /// [`child_token`](Self::child_token)) and exit cooperatively.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(future)
    }

    /// Waits for every tracked loop to exit, up to `grace`.
    ///
    /// Closes the tracker to new spawns. On timeout the remaining loops are
    /// abandoned and [`RuntimeError::GraceExceeded`] is returned.
    pub async fn join_with_grace(&self, grace: Duration) -> Result<(), RuntimeError> {
        self.tracker.close();
        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => Ok(()),
            Err(_) => Err(RuntimeError::GraceExceeded { grace }),
        }
    }
}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners. Returns `Ok(())` when any
/// signal is received, or `Err` if signal registration fails.
///
/// **Unix:** `SIGINT`, `SIGTERM`, `SIGQUIT`. **Elsewhere:** Ctrl-C.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal (Ctrl-C on non-unix platforms).
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_every_loop_observes_shutdown_exactly_once() {
        let coordinator = ShutdownCoordinator::new();
        let finished = Arc::new(AtomicUsize::new(0));

        for _ in 0..4 {
            let me = coordinator.clone();
            let finished = Arc::clone(&finished);
            coordinator.spawn(async move {
                me.triggered().await;
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }

        coordinator.trigger();
        coordinator.trigger(); // idempotent, not a double-fire fault
        coordinator
            .join_with_grace(Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(finished.load(Ordering::SeqCst), 4);
        assert!(coordinator.is_triggered());
    }

    #[tokio::test]
    async fn test_grace_exceeded_abandons_stuck_loop() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.spawn(async {
            std::future::pending::<()>().await;
        });

        coordinator.trigger();
        let err = coordinator
            .join_with_grace(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::GraceExceeded { .. }));
        assert_eq!(err.as_label(), "runtime_grace_exceeded");
    }

    #[tokio::test]
    async fn test_child_token_fires_with_parent() {
        let coordinator = ShutdownCoordinator::new();
        let child = coordinator.child_token();
        assert!(!child.is_cancelled());

        coordinator.trigger();
        child.cancelled().await;
    }
}
