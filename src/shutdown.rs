//! Graceful shutdown.
//!
//! Every clone of [`Guard`] keeps the server alive; [`Shutdown::drain`]
//! resolves once all of them have been dropped.

use tokio::signal;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Debug)]
pub struct Shutdown {
    guard_tx: mpsc::Sender<()>,
    guard_rx: mpsc::Receiver<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (guard_tx, guard_rx) = mpsc::channel(1);

        Self { guard_tx, guard_rx }
    }

    pub fn guard(&self) -> Guard {
        Guard {
            _handle: self.guard_tx.clone(),
        }
    }

    /// Wait for every outstanding guard to be dropped.
    pub async fn drain(mut self) {
        drop(self.guard_tx);

        // nothing is ever sent, so this returns None once all senders are gone
        let _ = self.guard_rx.recv().await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Held by anything that must finish before the process exits.
#[derive(Clone, Debug)]
pub struct Guard {
    _handle: mpsc::Sender<()>,
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::time::timeout;

    #[tokio::test]
    async fn drain_without_guards() {
        timeout(Duration::from_secs(1), Shutdown::new().drain())
            .await
            .expect("drain should finish immediately");
    }

    #[tokio::test]
    async fn drain_waits_for_guards() {
        let shutdown = Shutdown::new();
        let guard = shutdown.guard();
        let copy = guard.clone();

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let holder = tokio::spawn(async move {
            let _ = release_rx.await;
            drop(copy);
        });
        drop(guard);

        let mut drain = Box::pin(shutdown.drain());
        assert!(timeout(Duration::from_millis(50), &mut drain).await.is_err());

        release_tx.send(()).unwrap();
        holder.await.unwrap();
        timeout(Duration::from_secs(1), drain)
            .await
            .expect("drain should finish once guards are gone");
    }
}
