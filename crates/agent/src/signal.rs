//! Pending configuration-change flag and process signal wiring.
//!
//! [`ConfigChangeSignal`] is a cloneable handle around one atomic boolean.
//! Any number of producers may [`raise`](ConfigChangeSignal::raise) it; the
//! poller consumes it once per tick with [`take`](ConfigChangeSignal::take).
//! Repeated raises between two takes collapse into one pending change.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct ConfigChangeSignal {
    pending: Arc<AtomicBool>,
}

impl ConfigChangeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a configuration change as pending.
    pub fn raise(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Clear the flag, returning whether a change was pending.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

/// Raise `signal` on every SIGHUP until `cancel` fires.
#[cfg(unix)]
pub async fn forward_reload_requests(signal: ConfigChangeSignal, cancel: CancellationToken) {
    use tokio::signal::unix::{signal as unix_signal, SignalKind};

    let mut hangup = match unix_signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGHUP handler -- config reloads disabled");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = hangup.recv() => {
                if received.is_none() {
                    break;
                }
                tracing::info!("Received SIGHUP, configuration regeneration queued");
                signal.raise();
            }
        }
    }
}

/// Wait for SIGINT or SIGTERM, then cancel `cancel`.
pub async fn cancel_on_shutdown(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), stopping after the current tick");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, stopping after the current tick");
        }
    }

    cancel.cancel();
}
