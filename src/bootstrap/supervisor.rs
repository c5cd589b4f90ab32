use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::daemon::{exit_code, DaemonProcess};
use crate::error::{BootstrapError, Result};

/// How supervision ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Supervised {
    /// The daemon exited on its own with this code.
    Exited(i32),
    /// Shutdown was requested; the daemon was stopped and exited with this code.
    Stopped(i32),
}

/// Block until the daemon exits or `cancel` fires, whichever comes first.
///
/// On cancellation the daemon gets SIGTERM and `grace` to exit before it is killed,
/// so it is never left running after the supervisor returns.
pub async fn supervise(
    daemon: &mut DaemonProcess,
    cancel: &CancellationToken,
    grace: Duration,
) -> Result<Supervised> {
    tracing::info!(pid = daemon.pid(), "Supervising daemon");

    tokio::select! {
        status = daemon.wait() => {
            let status = status.map_err(|err| {
                BootstrapError::DaemonLaunchFailed(format!("lost track of daemon process: {}", err))
            })?;
            let code = exit_code(&status);
            if status.success() {
                tracing::info!(code, "Daemon exited");
            } else {
                tracing::error!(code, %status, "Daemon exited with failure");
            }
            Ok(Supervised::Exited(code))
        }
        _ = cancel.cancelled() => {
            tracing::info!("Shutdown requested, stopping daemon");
            let code = stop(daemon, grace).await;
            Ok(Supervised::Stopped(code))
        }
    }
}

/// Stop the daemon after a failure or interrupt. Returns its exit code.
pub async fn stop(daemon: &mut DaemonProcess, grace: Duration) -> i32 {
    match daemon.terminate(grace).await {
        Ok(status) => exit_code(&status),
        Err(err) => {
            tracing::error!(error = %err, "Failed to stop daemon");
            1
        }
    }
}
