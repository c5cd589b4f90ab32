use std::io;
use std::sync::{Arc, OnceLock};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Turns SIGTERM / SIGINT into a cancellation the bootstrap phases observe.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    received: Arc<OnceLock<i32>>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Signal number of the first shutdown request, if it came from a signal.
    pub fn received(&self) -> Option<i32> {
        self.received.get().copied()
    }

    pub fn trigger(&self, signal: Option<i32>) {
        if let Some(signo) = signal {
            let _ = self.received.set(signo);
        }
        self.token.cancel();
    }

    /// Install the signal handlers. Must be called from within the runtime.
    #[cfg(unix)]
    pub fn listen(&self) -> io::Result<JoinHandle<()>> {
        use nix::sys::signal::Signal;
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        let mut interrupt = signal(SignalKind::interrupt())?;
        let shutdown = self.clone();

        Ok(tokio::spawn(async move {
            let signo = tokio::select! {
                _ = terminate.recv() => Signal::SIGTERM,
                _ = interrupt.recv() => Signal::SIGINT,
            };
            tracing::info!(signal = %signo, "Shutdown signal received");
            shutdown.trigger(Some(signo as i32));
        }))
    }

    #[cfg(not(unix))]
    pub fn listen(&self) -> io::Result<JoinHandle<()>> {
        let shutdown = self.clone();
        Ok(tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                shutdown.trigger(Some(2));
            }
        }))
    }
}
